//! Process-level exit tests
//!
//! The test re-runs its own binary as a child process, sends that child a
//! real SIGTERM and checks both the stored rows and how the child died.

#![cfg(all(unix, feature = "columnar"))]

use rust_batch_logger::prelude::*;
use rust_batch_logger::sinks::columnar::read_rows;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const CHILD_BASE_ENV: &str = "RUST_BATCH_LOGGER_SIGNAL_CHILD_BASE";
const TEST_NAME: &str = "test_sigterm_flushes_then_dies_by_signal";

fn run_child(base: &Path) {
    let registry = LoggerRegistry::new();
    let _hooks = ExitHooks::install(registry.clone()).expect("Failed to install exit hooks");
    let logger = registry
        .configure(
            LoggerConfig::new("child")
                .console(false, false)
                .columnar(base)
                .project("proj")
                .environment("signal")
                .flush_threshold(100),
        )
        .expect("Failed to configure logger");

    for i in 0..3 {
        logger.info(format!("before signal {}", i));
    }

    unsafe {
        libc::kill(libc::getpid(), libc::SIGTERM);
    }
    thread::sleep(Duration::from_secs(20));
    panic!("child survived SIGTERM");
}

#[test]
fn test_sigterm_flushes_then_dies_by_signal() {
    if let Some(base) = std::env::var_os(CHILD_BASE_ENV) {
        run_child(Path::new(&base));
        return;
    }

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let status = Command::new(std::env::current_exe().expect("Failed to locate test binary"))
        .args([TEST_NAME, "--exact", "--test-threads=1"])
        .env(CHILD_BASE_ENV, temp_dir.path())
        .status()
        .expect("Failed to run child");

    assert_eq!(status.signal(), Some(libc::SIGTERM), "child status: {:?}", status);

    let path = PartitionSpec::new(temp_dir.path(), "proj", "signal").current_path();
    let rows = read_rows(&path).expect("Failed to read rows");
    let messages: Vec<&str> = rows.iter().map(|r| r.raw_message.as_str()).collect();
    assert_eq!(messages, vec!["before signal 0", "before signal 1", "before signal 2"]);
}
