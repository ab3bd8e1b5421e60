//! # FastCa Entry Point
//!
//! Headless start-up: opens (and if needed migrates) the store, then prints
//! every item with its measurement count and total area.
//!
//! ## Startup Sequence
//! 1. Load configuration (environment + defaults)
//! 2. Initialize tracing (logging)
//! 3. Open the database: migrate, validate schema
//! 4. Print the summary and close
//!
//! A store that cannot be opened or migrated ends the process with a
//! non-zero exit code.

use std::process::ExitCode;

use fastca::config::AppConfig;
use fastca::error::AppResult;
use fastca::{init_tracing, App};
use fastca_core::total_area;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let config = AppConfig::from_env();
    init_tracing(&config);

    let app = match App::start(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(fatal = e.fatal, "Start-up failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = print_summary(&app).await;
    app.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn print_summary(app: &App) -> AppResult<()> {
    let db = app.database();
    let items = db.items().list().await?;

    println!("{} items", items.len());
    for item in &items {
        let measurements = db.measurements().list_for_owner(&item.id).await?;
        println!(
            "  {}  {:>3} rows  {:>10.3} m²",
            item.id,
            measurements.len(),
            total_area(&measurements)
        );
    }

    Ok(())
}
