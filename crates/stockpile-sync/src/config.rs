//! Engine configuration.

use serde::Deserialize;

use stockpile_core::MAX_BATCH_OPS;

use crate::error::{Error, Result};

/// Default documents per page for view pagination.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Default operations per delete batch.
///
/// Strictly below [`MAX_BATCH_OPS`] so plan-internal overhead can never
/// overflow a commit.
pub const DEFAULT_BATCH_CAP: usize = 450;

/// Tunables shared by both engines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Documents fetched per page by the view engine.
    pub page_size: usize,
    /// Operations queued per batch by the deletion engine before a flush.
    pub batch_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_cap: DEFAULT_BATCH_CAP,
        }
    }
}

impl SyncConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a bound is zero or the batch cap
    /// exceeds the backend's hard per-batch limit.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page_size must be at least 1".into()));
        }
        if self.batch_cap == 0 {
            return Err(Error::InvalidConfig("batch_cap must be at least 1".into()));
        }
        if self.batch_cap > MAX_BATCH_OPS {
            return Err(Error::InvalidConfig(format!(
                "batch_cap {} exceeds the backend limit of {MAX_BATCH_OPS}",
                self.batch_cap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = SyncConfig::default();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.batch_cap, 450);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_and_oversized_bounds() {
        let config = SyncConfig {
            page_size: 0,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SyncConfig {
            batch_cap: MAX_BATCH_OPS + 1,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SyncConfig {
            batch_cap: MAX_BATCH_OPS,
            ..SyncConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"page_size": 10}"#).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.batch_cap, DEFAULT_BATCH_CAP);
        assert!(serde_json::from_str::<SyncConfig>(r#"{"page_sise": 10}"#).is_err());
    }
}
