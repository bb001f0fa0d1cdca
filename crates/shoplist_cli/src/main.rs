//! Startup probe for the shopping-list core.
//!
//! # Responsibility
//! - Load configuration, start logging and open the migrated database.
//! - Print the schema version and active row counts per table.
//!
//! Usage: `shoplist_cli [CONFIG_PATH]` (defaults to `.dsn`).
//! Any configuration or storage failure is fatal (exit code 1).

use log::info;
use shoplist_core::db::schema::TABLES;
use shoplist_core::{
    core_version, init_logging_from_config, latest_version, open_db_with_config, AppConfig,
    DEFAULT_CONFIG_FILE,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("shoplist_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load(config_path)?;
    if let Some(log_config) = &config.log {
        init_logging_from_config(log_config)?;
    }

    let conn = open_db_with_config(&config.db)?;
    info!("event=cli_probe module=cli status=ok schema_version={}", latest_version());

    println!("shoplist_core version={}", core_version());
    println!("schema_version={}", latest_version());
    for table in TABLES {
        let active: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL;", table.name),
            [],
            |row| row.get(0),
        )?;
        println!("table={} active_rows={}", table.name, active);
    }

    Ok(())
}
