//! Columnar logging example
//!
//! Batches records into a partitioned Parquet file and reads it back.
//!
//! Run with: cargo run --example columnar_logging

use rust_batch_logger::prelude::*;
use rust_batch_logger::sinks::columnar::read_rows;
use rust_batch_logger::warning;
use std::thread;

fn main() -> Result<()> {
    println!("=== Rust Batch Logger - Columnar Logging Example ===\n");

    let base = std::env::temp_dir().join("rust_batch_logger_demo");
    let registry = LoggerRegistry::new();
    let exit = ExitHooks::install(registry.clone())?;

    let logger = registry.configure(
        LoggerConfig::new("columnar-demo")
            .console(true, true)
            .columnar(&base)
            .project("demo")
            .environment("development")
            .flush_threshold(25)
            .compression(Compression::Zstd),
    )?;

    println!("1. Logging from 4 threads (25 records per batch):");
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..30 {
                    if i % 10 == 9 {
                        warning!(logger, "worker {} slow step {}", worker, i);
                    } else {
                        logger.debug(format!("worker {} step {}", worker, i));
                        logger.info(format!("worker {} step {}", worker, i));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }

    println!("\n2. Shutting down, which flushes the partial batch");
    exit.shutdown();

    let path = PartitionSpec::new(&base, "demo", "development").current_path();
    let rows = read_rows(&path)?;
    println!("\n3. {} rows stored in {}", rows.len(), path.display());
    for row in rows.iter().take(3) {
        println!("   {} | {} | {}", row.level, row.logger_name, row.raw_message);
    }

    Ok(())
}
