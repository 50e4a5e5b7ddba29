//! `sdm config` – show config path and effective settings.

use anyhow::Result;
use sdm_core::config::{self, SdmConfig};
use std::path::Path;

pub fn run_config(cfg: &SdmConfig, explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
