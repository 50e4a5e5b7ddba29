//! HTTP(S) transfer over libcurl, writing through a `.part` file.

use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::TransferConfig;
use crate::request::Request;

use super::{Transfer, TransferError};

/// Path for the in-progress file: appends `.part` to the final path.
pub fn part_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}

/// Single-connection GET of `request.url()` into `request.destination()`.
///
/// The body goes to `<destination>.part` and is renamed into place only on a
/// 2xx response; on failure or cancellation the partial file is removed.
/// Cancellation is polled from curl's progress callback, which libcurl
/// invokes roughly once per second even when no data arrives.
#[derive(Debug, Clone, Default)]
pub struct CurlTransfer {
    cfg: TransferConfig,
}

impl CurlTransfer {
    pub fn new(cfg: TransferConfig) -> Self {
        Self { cfg }
    }

    fn fetch(&self, request: &Request, file: &mut fs::File) -> Result<(), TransferError> {
        let token = request.cancel_token();
        let write_error: Cell<Option<std::io::Error>> = Cell::new(None);

        let mut easy = curl::easy::Easy::new();
        easy.url(request.url())?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(self.cfg.connect_timeout_secs))?;
        // Abort if throughput stays below the limit for low_speed_time.
        easy.low_speed_limit(self.cfg.low_speed_limit)?;
        easy.low_speed_time(Duration::from_secs(self.cfg.low_speed_time_secs))?;
        easy.timeout(Duration::from_secs(self.cfg.timeout_secs))?;
        if let Some(ref ua) = self.cfg.user_agent {
            easy.useragent(ua)?;
        }
        easy.progress(true)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_error.set(Some(e));
                    Ok(0)
                }
            })?;
            transfer.progress_function(|_, _, _, _| !token.is_cancelled())?;
            if let Err(e) = transfer.perform() {
                if e.is_aborted_by_callback() || token.is_cancelled() {
                    return Err(TransferError::Aborted);
                }
                if e.is_write_error() {
                    if let Some(io_err) = write_error.take() {
                        return Err(TransferError::Io(io_err));
                    }
                }
                return Err(TransferError::Curl(e));
            }
        }

        let code = easy.response_code()?;
        // Non-HTTP schemes (file://) report 0.
        if code != 0 && !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        Ok(())
    }
}

impl Transfer for CurlTransfer {
    fn run(&self, request: &Request) -> Result<(), TransferError> {
        if request.is_cancel_requested() {
            return Err(TransferError::Aborted);
        }

        let final_path = request.destination();
        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = part_path(final_path);
        let mut file = fs::File::create(&tmp)?;

        match self.fetch(request, &mut file) {
            Ok(()) => {
                file.sync_all()?;
                drop(file);
                fs::rename(&tmp, final_path)?;
                tracing::debug!(id = %request.id(), path = %final_path.display(), "transfer complete");
                Ok(())
            }
            Err(e) => {
                drop(file);
                if fs::remove_file(&tmp).is_err() {
                    tracing::warn!(path = %tmp.display(), "could not remove partial file");
                }
                Err(e)
            }
        }
    }
}
