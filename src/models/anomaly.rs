use serde::{Deserialize, Serialize};
use strum::Display;

/// Kind of anomaly detected across reports or within a claim set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    Value,
    Temporal,
    Consistency,
}

/// Severity scale for anomalies. Wider than finding severity because a
/// contradiction between a claim and a measurement can be outright
/// disqualifying.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalySeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl AnomalySeverity {
    /// Contribution to the aggregate risk score.
    pub fn weight(self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.7,
            Self::Medium => 0.4,
            Self::Low => 0.2,
        }
    }
}

/// A single detected anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyType,
    pub severity: AnomalySeverity,
    pub description: String,
    pub recommendation: String,
}

/// Output of the temporal anomaly detector: the anomalies themselves, an
/// aggregate risk score in 0-1, and deduplicated recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies: Vec<Anomaly>,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
}
