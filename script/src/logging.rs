//! Tracing subscriber setup.
//!
//! Scripts log through `tracing`. [`init`] installs a global subscriber on
//! stderr, filtered by the settings' level and formatted as text or JSON.
//! Stdout stays free for the script's own output.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{ConfigError, LOG_VAR, LogFormat, Settings};

/// Builds the event filter for `settings`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the level is not a valid filter
/// directive.
pub fn filter(settings: &Settings) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(&settings.log_level).map_err(|_| ConfigError::InvalidValue {
        var: LOG_VAR.to_string(),
        value: settings.log_level.clone(),
    })
}

/// Installs the global subscriber.
///
/// Returns `Ok(false)` if a subscriber was already installed, which leaves
/// the existing one in place.
///
/// # Errors
///
/// Returns [`ConfigError`] if the log level is invalid.
pub fn init(settings: &Settings) -> Result<bool, ConfigError> {
    let filter = filter(settings)?;

    let installed = match settings.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init(),
    };

    Ok(installed.is_ok())
}
