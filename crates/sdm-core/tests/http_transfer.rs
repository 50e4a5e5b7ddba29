//! Integration test: the curl transfer driven by a real queue manager against
//! a local HTTP server.

mod common;

use std::sync::mpsc;
use std::time::{Duration, Instant};

use sdm_core::config::SdmConfig;
use sdm_core::destination::destination_for;
use sdm_core::transfer::part_path;
use sdm_core::{NewRequest, QueueManager, RequestStatus, TransferOutcome};
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(20);

#[test]
fn downloads_file_and_matches_body() {
    let body: Vec<u8> = (0u8..100).cycle().take(64 * 1024).collect();
    let base = common::http_server::start(body.clone());
    let dir = tempdir().unwrap();

    let (tx, rx) = mpsc::channel();
    let m = QueueManager::from_config(&SdmConfig::default()).with_completions(tx);
    m.start().unwrap();

    let url = format!("{}/pool/main/payload.bin", base);
    let dest = destination_for(&url, dir.path());
    let id = m.submit(NewRequest::new(url, dest.clone()));

    let done = rx.recv_timeout(WAIT).expect("completion");
    assert_eq!(done.id, id);
    assert_eq!(done.outcome, TransferOutcome::Completed);
    assert_eq!(dest.file_name().unwrap(), "payload.bin");
    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert!(!part_path(&dest).exists());
    assert_eq!(m.query(id), RequestStatus::NotFound);
}

#[test]
fn http_error_reports_failure_and_cleans_up() {
    let base = common::http_server::start(Vec::new());
    let dir = tempdir().unwrap();

    let (tx, rx) = mpsc::channel();
    let m = QueueManager::from_config(&SdmConfig::default()).with_completions(tx);
    m.start().unwrap();

    let dest = dir.path().join("missing.bin");
    m.submit(NewRequest::new(format!("{}/missing", base), dest.clone()));

    let done = rx.recv_timeout(WAIT).expect("completion");
    assert_eq!(done.outcome, TransferOutcome::Failed("HTTP 404".to_string()));
    assert!(!dest.exists());
    assert!(!part_path(&dest).exists());
}

#[test]
fn cancel_aborts_slow_transfer() {
    let base = common::http_server::start(Vec::new());
    let dir = tempdir().unwrap();

    let (tx, rx) = mpsc::channel();
    let m = QueueManager::from_config(&SdmConfig::default()).with_completions(tx);
    m.start().unwrap();

    let dest = dir.path().join("slow.bin");
    let id = m.submit(NewRequest::new(format!("{}/slow", base), dest.clone()));

    let deadline = Instant::now() + WAIT;
    while m.query(id) != RequestStatus::Running {
        assert!(Instant::now() < deadline, "transfer never started");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(m.cancel(id));

    let done = rx.recv_timeout(WAIT).expect("completion");
    assert_eq!(done.outcome, TransferOutcome::Cancelled);
    assert!(!dest.exists());
    assert!(!part_path(&dest).exists());
}
