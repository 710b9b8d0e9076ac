//! Token inspection command.

use crate::commands::load_settings;
use crate::error::CliResult;
use pwa_push::VapidJwtBuilder;
use std::path::Path;

/// Print a VAPID token (or the full `Authorization` value) for `endpoint`.
pub fn execute(config: Option<&Path>, endpoint: &str, header: bool) -> CliResult<()> {
    let settings = load_settings(config)?;
    let keys = settings.vapid_keys()?;

    let builder = VapidJwtBuilder::new(keys.signing_key()?, &settings.admin_email);
    let token = builder.build(endpoint)?;

    if header {
        println!("vapid t={}, k={}", token, keys.public_key);
    } else {
        println!("{}", token);
    }
    Ok(())
}
