//! CLI command implementations.

pub mod jwt;
pub mod keygen;
pub mod publish;
pub mod send;

use crate::error::{CliError, CliResult};
use colored::Colorize;
use pwa_push::DispatchReport;
use pwa_push_config::{PushSettings, SettingsLoader};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Settings from the optional file plus `PWA_PUSH_*` variables.
pub fn load_settings(config: Option<&Path>) -> CliResult<PushSettings> {
    let mut loader = SettingsLoader::new();
    if let Some(path) = config {
        loader = loader.file(path);
    }
    Ok(loader.load()?)
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::Input {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Print per-subscription results and a summary line.
pub fn print_report(report: &DispatchReport, quiet: bool) {
    if !quiet {
        for result in report.results() {
            match result.error() {
                None => println!("  {} {}", "✓".green(), result.endpoint),
                Some(e) if e.should_remove_subscription() => {
                    println!("  {} {} ({})", "✗".yellow(), result.endpoint, e)
                }
                Some(e) => println!("  {} {} ({})", "✗".red(), result.endpoint, e),
            }
        }
        println!();
    }

    println!(
        "{} delivered, {} failed, {} gone",
        report.delivered(),
        report.failed(),
        report.gone_endpoints().len()
    );
}

/// Write the gone endpoints as a JSON array.
pub fn write_gone(report: &DispatchReport, path: &Path) -> CliResult<()> {
    let gone = serde_json::to_string_pretty(&report.gone_endpoints()).map_err(|e| {
        CliError::Input {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    })?;
    fs::write(path, gone)?;
    Ok(())
}
