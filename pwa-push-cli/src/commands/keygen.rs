//! Key generation command.

use crate::error::{CliError, CliResult};
use pwa_push::VapidKeyPair;
use std::fs;
use std::path::Path;

/// Generate a VAPID key pair, printing it or writing it to `output`.
pub fn execute(output: Option<&Path>, json: bool, force: bool) -> CliResult<()> {
    let keys = VapidKeyPair::generate()?;

    let rendered = if json {
        serde_json::to_string_pretty(&keys).map_err(pwa_push::PushError::from)? + "\n"
    } else {
        format!(
            "PWA_PUSH_PUBLIC_KEY={}\nPWA_PUSH_PRIVATE_KEY={}\n",
            keys.public_key, keys.private_key
        )
    };

    match output {
        Some(path) => {
            if path.exists() && !force {
                return Err(CliError::FileExists(path.display().to_string()));
            }
            fs::write(path, rendered)?;
            eprintln!("Wrote VAPID keys to {}", path.display());
            println!("{}", keys.public_key);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
