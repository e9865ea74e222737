//! Configuration for settlement engine

use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger configuration (storage backend, data directory, default currency)
    pub ledger: ledger_core::Config,

    /// Netting configuration
    pub netting: NettingConfig,

    /// Report output configuration
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: ledger_core::Config::default(),
            netting: NettingConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Netting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// Re-apply every suggestion plan to the balances and require all zeros
    pub verify_plan: bool,
}

impl Default for NettingConfig {
    fn default() -> Self {
        Self { verify_plan: true }
    }
}

/// Output format of the summary report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable table
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl ReportFormat {
    /// Parse format name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format
    pub format: ReportFormat,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config {
            ledger: ledger_core::Config::from_env()?,
            ..Default::default()
        };

        if let Ok(flag) = std::env::var("SETTLEMENT_VERIFY_PLAN") {
            config.netting.verify_plan = parse_flag(&flag).ok_or_else(|| {
                crate::Error::Config(format!("Invalid SETTLEMENT_VERIFY_PLAN '{}'", flag))
            })?;
        }

        if let Ok(format) = std::env::var("SETTLEMENT_REPORT_FORMAT") {
            config.report.format = ReportFormat::from_name(&format).ok_or_else(|| {
                crate::Error::Config(format!("Unknown report format '{}'", format))
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::config::StorageBackend;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service_name, "settlement-engine");
        assert!(config.netting.verify_plan);
        assert_eq!(config.report.format, ReportFormat::Text);
        assert_eq!(config.ledger.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [netting]
            verify_plan = false

            [report]
            format = "json"

            [ledger.storage]
            backend = "file"
            "#,
        )
        .unwrap();

        assert!(!config.netting.verify_plan);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.ledger.storage.backend, StorageBackend::File);
        assert_eq!(config.service_name, "settlement-engine");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("netting = 3"),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(ReportFormat::from_name("JSON"), Some(ReportFormat::Json));
    }
}
