//! Configuration validation.

use super::Config;
use crate::core::identifier::MaxIdentifierLength;
use crate::drivers::DialectKind;
use crate::error::{Result, SyncError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Connection validation
    if config.connection.url.trim().is_empty() {
        return Err(SyncError::Config("connection.url is required".into()));
    }
    if let Some(name) = &config.connection.dialect {
        if DialectKind::from_name(name).is_none() {
            return Err(SyncError::Config(format!(
                "connection.dialect '{}' is not a known dialect",
                name
            )));
        }
    }

    // Dialect settings
    if config.dialect.numeric_scale_high < 0 {
        return Err(SyncError::Config(
            "dialect.numeric_scale_high must not be negative".into(),
        ));
    }
    if let Some(0) = config.dialect.string_length {
        return Err(SyncError::Config(
            "dialect.string_length must be at least 1".into(),
        ));
    }

    // Source validation: exactly one of tables/query, mode columns present
    config
        .source
        .query_sources(MaxIdentifierLength::Unbounded)?;
    config.source.query_mode()?;

    if config.source.poll_interval_ms == 0 {
        return Err(SyncError::Config(
            "source.poll_interval_ms must be at least 1".into(),
        ));
    }
    if config.source.batch_max_rows == 0 {
        return Err(SyncError::Config(
            "source.batch_max_rows must be at least 1".into(),
        ));
    }

    Ok(())
}
