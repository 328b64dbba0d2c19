use url::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Intervals, retry attempts and concurrency are not 0
/// - Catalogue and Transmission URLs parse
/// - Label prefixes are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if let Some(transmission) = &config.transmission {
        Url::parse(&transmission.url).map_err(|e| {
            invalid(&format!(
                "transmission.url '{}' is not a valid url: {}",
                transmission.url, e
            ))
        })?;
    }

    let catalogue = &config.catalogue;
    Url::parse(&catalogue.url).map_err(|e| {
        invalid(&format!(
            "catalogue.url '{}' is not a valid url: {}",
            catalogue.url, e
        ))
    })?;
    if catalogue.refresh_interval_secs == 0 {
        return Err(invalid("catalogue.refresh_interval_secs cannot be 0"));
    }
    if catalogue.retry.attempts == 0 {
        return Err(invalid("catalogue.retry.attempts must be at least 1"));
    }

    let reconciler = &config.reconciler;
    if reconciler.pass_interval_secs == 0 {
        return Err(invalid("reconciler.pass_interval_secs cannot be 0"));
    }
    if reconciler.snapshot_interval_secs == 0 {
        return Err(invalid("reconciler.snapshot_interval_secs cannot be 0"));
    }
    if reconciler.retry.attempts == 0 {
        return Err(invalid("reconciler.retry.attempts must be at least 1"));
    }
    if reconciler.max_concurrent_items == 0 {
        return Err(invalid("reconciler.max_concurrent_items must be at least 1"));
    }

    for (label, prefix) in &config.labels {
        if prefix.is_empty() {
            return Err(invalid(&format!("labels.{} has an empty path prefix", label)));
        }
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
