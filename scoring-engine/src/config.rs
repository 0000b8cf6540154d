//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables of the scoring engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Weight of the weight-module z-score in the relative component
    pub alpha: f64,

    /// Weight of the entropy z-score in the relative component
    pub beta: f64,

    /// Default recent window length (days)
    pub recent_days: i64,

    /// Historical baseline window length (days)
    pub historical_days: i64,

    /// Datasets whose newest timestamp is older than this are treated as
    /// historical and analysed relative to their own end (days)
    pub historical_mode_threshold_days: i64,

    /// Use the TP/SP aggregation; the legacy path exists for comparison only
    pub use_tp_sp_system: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta: 0.4,
            recent_days: 30,
            historical_days: 365,
            historical_mode_threshold_days: 90,
            use_tp_sp_system: true,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.recent_days <= 0 {
            return Err(Error::InvalidConfig(format!(
                "recent_days must be positive, got {}",
                self.recent_days
            )));
        }
        if self.historical_days <= 0 {
            return Err(Error::InvalidConfig(format!(
                "historical_days must be positive, got {}",
                self.historical_days
            )));
        }
        if self.alpha < 0.0 || self.beta < 0.0 {
            return Err(Error::InvalidConfig(
                "alpha and beta must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_windows() {
        let config = EngineConfig {
            historical_days: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.alpha, back.alpha);
        assert_eq!(config.historical_days, back.historical_days);
    }
}
