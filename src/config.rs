//! Configuration management for the rule pipeline

use crate::error::PipelineError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default config file, read when present
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `FRAUD_RULES__SCORING__FLAGGED_USER_SCORE=6`
pub const ENV_PREFIX: &str = "FRAUD_RULES";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub rules: RulesConfig,
    pub scoring: ScoringConfig,
    pub presenter: PresenterConfig,
    pub logging: LoggingConfig,
}

/// Thresholds and the merchant denylist used to derive flags
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// HighAmount fires when Amount is strictly above this
    pub high_amount_threshold: f64,
    /// NightTime fires when the hour of day is strictly below this
    pub night_end_hour: u32,
    /// RapidTransactions fires when the gap to the previous transaction is below this
    pub rapid_window_minutes: f64,
    /// RoundedAmount fires when Amount is an exact multiple of this
    pub rounded_amount_unit: f64,
    /// Exact, case-sensitive merchant names
    pub blacklisted_merchants: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            high_amount_threshold: 10_000.0,
            night_end_hour: 6,
            rapid_window_minutes: 10.0,
            rounded_amount_unit: 1_000.0,
            blacklisted_merchants: default_blacklisted_merchants(),
        }
    }
}

fn default_blacklisted_merchants() -> Vec<String> {
    vec!["gambling_site".to_string(), "shady_merchant".to_string()]
}

/// Flag weights and the user-level decision threshold
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight per flag name. Names are matched case-insensitively; unknown names are skipped.
    pub weights: HashMap<String, u32>,
    /// A user is flagged when their total score reaches this
    pub flagged_user_score: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            flagged_user_score: 5,
        }
    }
}

/// Observed weight table. Another deployment weights Blacklisted at 3; override
/// `scoring.weights.Blacklisted` to select it.
pub fn default_weights() -> HashMap<String, u32> {
    let mut weights = HashMap::new();
    weights.insert("HighAmount".to_string(), 2);
    weights.insert("NightTime".to_string(), 1);
    weights.insert("RapidTransactions".to_string(), 1);
    weights.insert("Blacklisted".to_string(), 2);
    weights.insert("RoundedAmount".to_string(), 1);
    weights.insert("IPChanged".to_string(), 1);
    weights.insert("DeviceChanged".to_string(), 1);
    weights
}

/// Presentation defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Minimum transaction score shown when none is requested
    pub default_min_score: u32,
    /// Score at which a transaction counts as flagged in the summary
    pub flagged_transaction_score: u32,
    /// File name used when exporting into a directory
    pub export_file_name: String,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            default_min_score: 3,
            flagged_transaction_score: 3,
            export_file_name: "flagged_transactions.csv".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/config.toml` if it exists, then environment overrides
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to build configuration")?;

        Self::finish(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to build configuration from {:?}", path.as_ref()))?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject rule settings that would make a flag meaningless
    pub fn validate(&self) -> Result<(), PipelineError> {
        let rules = &self.rules;
        if !(rules.rounded_amount_unit > 0.0) {
            return Err(PipelineError::Config(format!(
                "rules.rounded_amount_unit must be positive, got {}",
                rules.rounded_amount_unit
            )));
        }
        if (rules.rounded_amount_unit * 100.0).round() < 1.0 {
            return Err(PipelineError::Config(format!(
                "rules.rounded_amount_unit must be at least 0.01, got {}",
                rules.rounded_amount_unit
            )));
        }
        if rules.night_end_hour > 24 {
            return Err(PipelineError::Config(format!(
                "rules.night_end_hour must be within 0..=24, got {}",
                rules.night_end_hour
            )));
        }
        if !(rules.rapid_window_minutes > 0.0) {
            return Err(PipelineError::Config(format!(
                "rules.rapid_window_minutes must be positive, got {}",
                rules.rapid_window_minutes
            )));
        }
        if !rules.high_amount_threshold.is_finite() {
            return Err(PipelineError::Config(
                "rules.high_amount_threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
