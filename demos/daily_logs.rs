//! Environment presets example
//!
//! Configures a logger from the development/test/production presets and
//! writes text logs under `logs/<environment>/<date>/app.log`.
//!
//! Run with: cargo run --example daily_logs -- production

use rust_batch_logger::prelude::*;
use rust_batch_logger::{error, info};

fn main() -> Result<()> {
    let environment = std::env::args().nth(1).unwrap_or_else(|| "development".to_string());
    println!("=== Rust Batch Logger - '{}' preset ===\n", environment);

    let registry = LoggerRegistry::new();
    let _exit = ExitHooks::install(registry.clone())?;

    let mut config = LoggerConfig::preset(&environment, "daily");
    // Keep the demo self-contained: no Parquet output here.
    config.columnar = false;
    let log_file = config.log_file.clone();
    let logger = registry.configure(config)?;

    for order in 1..=5 {
        info!(logger, "processed order #{}", order);
    }
    error!(logger, "payment provider returned {}", 503);
    logger.flush()?;

    if let Some(path) = log_file {
        println!("Text log written to {}", path.display());
    }
    Ok(())
}
