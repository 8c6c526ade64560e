//! Pipeline configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! debounce_ms = 300
//! query_timeout_secs = 20
//!
//! [source]
//! url = "https://services.example.org/arcgis/rest/services/tracts/FeatureServer/0"
//! group_field = "county_name"
//!
//! [[variables]]
//! field_name = "pct_poverty"
//! name = "Poverty Rate"
//! value_type = "percentage"
//! years_available = [2018, 2019, 2020]
//! ```

use crate::error::ConfigError;
use geotrend_query::FeatureSource;
use geotrend_series::Variable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default hover quiet period
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Settings for one hover-chart pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hover quiet period in milliseconds
    pub debounce_ms: u64,
    /// Per-query time limit; unlimited when absent
    pub query_timeout_secs: Option<u64>,
    /// Feature layer queried for all three series
    pub source: FeatureSource,
    /// Variables that can be selected
    pub variables: Vec<Variable>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            query_timeout_secs: None,
            source: FeatureSource::new(""),
            variables: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Configuration for a source with defaults everywhere else
    #[inline]
    #[must_use]
    pub fn new(source: FeatureSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on bad syntax, `ConfigError::Invalid` when the
    /// values fail [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), variables = config.variables.len(), "configuration loaded");
        Ok(config)
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.url.as_str().trim().is_empty() {
            return Err(ConfigError::invalid("source.url must not be empty"));
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::invalid("debounce_ms must be greater than zero"));
        }
        if self.query_timeout_secs == Some(0) {
            return Err(ConfigError::invalid("query_timeout_secs must be greater than zero"));
        }

        let mut seen = HashSet::new();
        for variable in &self.variables {
            if variable.field_name.trim().is_empty() {
                return Err(ConfigError::invalid("variable field_name must not be empty"));
            }
            if !seen.insert(variable.field_name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "variable {} is declared more than once",
                    variable.field_name
                )));
            }
            if variable.years_available.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "variable {} has no years_available",
                    variable.field_name
                )));
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[inline]
    #[must_use]
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }

    /// Look up a catalog variable by its field name
    #[must_use]
    pub fn variable(&self, field_name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.field_name == field_name)
    }

    /// With hover quiet period
    #[inline]
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// With per-query time limit
    #[inline]
    #[must_use]
    pub fn with_query_timeout_secs(mut self, secs: u64) -> Self {
        self.query_timeout_secs = Some(secs);
        self
    }

    /// With an additional catalog variable
    #[inline]
    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrend_series::ValueType;

    const SAMPLE: &str = r#"
        debounce_ms = 250
        query_timeout_secs = 15

        [source]
        url = "https://host/FeatureServer/0"
        id_field = "geoid"

        [[variables]]
        field_name = "pct_poverty"
        name = "Poverty Rate"
        value_type = "percentage"
        years_available = [2020, 2018]

        [[variables]]
        field_name = "median_income"
        name = "Median Income"
        value_type = "money"
        years_available = [2019]
    "#;

    #[test]
    fn parses_full_config() {
        let config = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.query_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.source.url.as_str(), "https://host/FeatureServer/0");
        assert_eq!(config.source.fields.id_field, "geoid");
        // unspecified schema fields keep their defaults
        assert_eq!(config.source.fields.group_field, "county_name");
        assert_eq!(config.variable("median_income").unwrap().value_type, ValueType::Money);
        assert!(config.variable("missing").is_none());
    }

    #[test]
    fn defaults_apply() {
        let config = PipelineConfig::from_toml_str("[source]\nurl = \"memory://tracts\"\n").unwrap();
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.query_timeout(), None);
        assert!(config.variables.is_empty());
    }

    #[test]
    fn missing_source_is_invalid() {
        let err = PipelineConfig::from_toml_str("debounce_ms = 300").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("source.url")));
    }

    #[test]
    fn rejects_zero_debounce_and_timeout() {
        let base = PipelineConfig::new(FeatureSource::new("memory://tracts"));
        assert!(base.clone().with_debounce_ms(0).validate().is_err());
        assert!(base.clone().with_query_timeout_secs(0).validate().is_err());
        assert!(base.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_and_yearless_variables() {
        let var = Variable::new("pct", "Pct", ValueType::Percentage, vec![2020]);
        let dup = PipelineConfig::new(FeatureSource::new("memory://tracts"))
            .with_variable(var.clone())
            .with_variable(var);
        assert!(matches!(dup.validate(), Err(ConfigError::Invalid(m)) if m.contains("more than once")));

        let empty = PipelineConfig::new(FeatureSource::new("memory://tracts"))
            .with_variable(Variable::new("pct", "Pct", ValueType::Plain, Vec::new()));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn bad_syntax_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml_str("debounce_ms = ="),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geotrend.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config, PipelineConfig::from_toml_str(SAMPLE).unwrap());
        assert_eq!(config.variables.len(), 2);
    }

    #[test]
    fn load_validates_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"debounce_ms = 0\n[source]\nurl = \"memory://tracts\"\n").unwrap();

        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("debounce")));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = PipelineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
