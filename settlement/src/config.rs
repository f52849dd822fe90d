//! Settlement configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settlement service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name for logging
    pub service_name: String,

    /// Notification queue capacity
    pub notify_queue_capacity: usize,

    /// Default room search radius in kilometres
    pub match_radius_km: f64,

    /// Upper bound on the search radius a caller may request
    pub max_match_radius_km: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement".to_string(),
            notify_queue_capacity: 256,
            match_radius_km: 3.0,
            max_match_radius_km: 50.0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(radius) = std::env::var("SETTLEMENT_MATCH_RADIUS_KM") {
            self.match_radius_km = radius
                .parse()
                .map_err(|_| Error::Config(format!("Bad SETTLEMENT_MATCH_RADIUS_KM: {}", radius)))?;
        }
        if let Ok(capacity) = std::env::var("SETTLEMENT_NOTIFY_QUEUE_CAPACITY") {
            self.notify_queue_capacity = capacity.parse().map_err(|_| {
                Error::Config(format!("Bad SETTLEMENT_NOTIFY_QUEUE_CAPACITY: {}", capacity))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.match_radius_km <= 0.0 || self.match_radius_km > self.max_match_radius_km {
            return Err(Error::Config(format!(
                "match_radius_km must be in (0, {}], got {}",
                self.max_match_radius_km, self.match_radius_km
            )));
        }
        if self.notify_queue_capacity == 0 {
            return Err(Error::Config(
                "notify_queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.match_radius_km, 3.0);
    }

    #[test]
    fn test_radius_bounds() {
        let mut config = Config::default();
        config.match_radius_km = 0.0;
        assert!(config.validate().is_err());

        config.match_radius_km = 100.0;
        assert!(config.validate().is_err());

        config.match_radius_km = 50.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            r#"
service_name = "settlement-test"
match_radius_km = 5.0
"#,
        )
        .unwrap();

        let config = Config::from_file(temp.path()).unwrap();
        assert_eq!(config.service_name, "settlement-test");
        assert_eq!(config.match_radius_km, 5.0);
        // Unset fields fall back to defaults
        assert_eq!(config.notify_queue_capacity, 256);
    }
}
