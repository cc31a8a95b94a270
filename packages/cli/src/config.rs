//! `catchment` configuration: an optional TOML file, then `CATCHMENT_*`
//! environment variables, then command-line flags.

use std::path::Path;

use catchment_demographics::{AggregationOptions, NumberFormat};
use catchment_sectors::arcgis::SectorLayerConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatchmentConfig {
    pub sector_layer: SectorLayerConfig,
    pub aggregation: AggregationOptions,
    pub format: NumberFormat,
    pub seed: Option<u64>,
}

impl CatchmentConfig {
    /// Loads the file at `path` (defaults when `None`) and applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override has an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config: Self = toml::from_str(&text)?;
                log::debug!("Loaded configuration from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `CATCHMENT_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unparseable value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("CATCHMENT_SECTOR_LAYER_URL") {
            self.sector_layer.url = Some(url);
        }
        if let Some(value) = lookup("CATCHMENT_SECTOR_TIMEOUT_SECS") {
            self.sector_layer.timeout_secs = parse_number("CATCHMENT_SECTOR_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("CATCHMENT_MOCK_ON_FAILURE") {
            self.sector_layer.mock_on_failure = parse_flag("CATCHMENT_MOCK_ON_FAILURE", &value)?;
        }
        if let Some(value) = lookup("CATCHMENT_SEED") {
            self.seed = Some(parse_number("CATCHMENT_SEED", &value)?);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.aggregation.full_coverage_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                message: format!("aggregation.full_coverage_threshold must be 0-100, got {threshold}"),
            });
        }
        if self.sector_layer.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "sector_layer.timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        message: format!("{name}: expected a number, got {value:?}"),
    })
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            message: format!("{name}: expected true or false, got {value:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use catchment_spatial::CoverageMode;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: CatchmentConfig = toml::from_str("").unwrap();

        assert_eq!(config.sector_layer, SectorLayerConfig::default());
        assert!(config.sector_layer.url.is_none());
        assert!(config.sector_layer.fetch_options().mock_on_failure);
        assert_eq!(config.aggregation, AggregationOptions::default());
        assert_eq!(config.format, NumberFormat::default());
        assert_eq!(config.sector_layer.fetch_options().timeout, Duration::from_secs(30));
    }

    #[test]
    fn parses_all_sections() {
        let config: CatchmentConfig = toml::from_str(
            r#"
            seed = 7

            [sector_layer]
            url = "https://example.com/FeatureServer/0/query"
            max_records = 500
            timeout_secs = 10
            mock_on_failure = false

            [aggregation]
            coverage_mode = "exact"
            full_coverage_threshold = 99.5

            [format]
            thousands_separator = " "
            decimal_separator = ","
            "#,
        )
        .unwrap();

        let layer = &config.sector_layer;
        assert_eq!(
            layer.url.as_deref(),
            Some("https://example.com/FeatureServer/0/query")
        );
        assert_eq!(layer.max_records, 500);
        assert_eq!(layer.request_timeout(), Duration::from_secs(10) / 3);
        assert_eq!(config.aggregation.coverage_mode, CoverageMode::Exact);
        assert_eq!(config.format.thousands_separator, " ");
        assert_eq!(config.seed, Some(7));
        assert!(!config.sector_layer.fetch_options().mock_on_failure);
    }

    #[test]
    fn environment_overrides_file() {
        let env = BTreeMap::from([
            ("CATCHMENT_SECTOR_LAYER_URL", "https://layer.test/query"),
            ("CATCHMENT_SECTOR_TIMEOUT_SECS", "12"),
            ("CATCHMENT_MOCK_ON_FAILURE", "no"),
            ("CATCHMENT_SEED", "99"),
        ]);
        let mut config = CatchmentConfig::default();

        config
            .apply_overrides(|name| env.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(
            config.sector_layer.url.as_deref(),
            Some("https://layer.test/query")
        );
        assert_eq!(config.sector_layer.fetch_options().timeout, Duration::from_secs(12));
        assert!(!config.sector_layer.mock_on_failure);
        assert_eq!(config.seed, Some(99));
    }

    #[test]
    fn rejects_bad_override() {
        let mut config = CatchmentConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "CATCHMENT_MOCK_ON_FAILURE").then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = CatchmentConfig::default();
        config.aggregation.full_coverage_threshold = 150.0;
        assert!(config.validate().is_err());
    }
}
