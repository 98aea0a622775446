use serde::Deserialize;

/// Engine configuration, loaded from the environment (prefix `ENGINE_`)
/// with sensible defaults for every knob. The rule thresholds themselves
/// live in [`crate::services::rules::RuleSet`]; this struct carries the
/// workflow-level tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minimum confidence (0-100) for an analysis result to finalize
    /// without manual review.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: u8,

    /// Maximum processing attempts per queue item before it fails
    /// terminally.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Polling cadence of the background queue loop, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How many past validations to fetch for temporal anomaly detection.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Relative tolerance for nutritional claims (fraction of the claimed
    /// value).
    #[serde(default = "default_nutritional_tolerance")]
    pub nutritional_tolerance: f64,

    /// Relative tolerance for all other claim categories.
    #[serde(default = "default_claim_tolerance")]
    pub default_tolerance: f64,

    /// Fraction of WARNING data points above which an otherwise clean
    /// result is downgraded to PARTIAL.
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,
}

fn default_confidence_threshold() -> u8 {
    85
}

fn default_max_attempts() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_history_limit() -> usize {
    5
}

fn default_nutritional_tolerance() -> f64 {
    0.05
}

fn default_claim_tolerance() -> f64 {
    0.02
}

fn default_warning_ratio() -> f64 {
    0.3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            history_limit: default_history_limit(),
            nutritional_tolerance: default_nutritional_tolerance(),
            default_tolerance: default_claim_tolerance(),
            warning_ratio: default_warning_ratio(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `ENGINE_`-prefixed environment variables,
    /// reading a `.env` file first if one is present.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("ENGINE_").from_env()
    }
}
