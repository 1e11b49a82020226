//! Basic logger usage example
//!
//! Demonstrates console logging, level filtering and the tiered templates.
//!
//! Run with: cargo run --example basic_usage

use rust_batch_logger::prelude::*;
use rust_batch_logger::{info, warning};

fn main() -> Result<()> {
    println!("=== Rust Batch Logger - Basic Usage Example ===\n");

    let registry = LoggerRegistry::new();
    let _exit = ExitHooks::install(registry.clone())?;

    let logger = registry.configure(LoggerConfig::new("basic").level(LogLevel::Debug))?;

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warning("This is a warning message (with source location)");
    logger.error("This is an error message");
    logger.critical("This is a critical message");
    logger.flush()?;

    println!("\n2. Raising the threshold to WARNING:");
    logger.set_level(LogLevel::Warning);
    logger.debug("Debug message (hidden)");
    logger.info("Info message (hidden)");
    warning!(logger, "Disk usage at {}%", 91);
    logger.flush()?;

    println!("\n3. Logging an error chain:");
    let err = std::fs::read_to_string("/definitely/not/here").unwrap_err();
    logger.exception("Could not load settings", &err);
    logger.flush()?;

    info!(logger, "hidden: below the current threshold");

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
