use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::report::DataPoint;

/// Severity of a finding, ordered from most to least impactful.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Confidence penalty contributed by a finding of this severity.
    pub fn weight(self) -> u8 {
        match self {
            Self::High => 20,
            Self::Medium => 10,
            Self::Low => 5,
            Self::Info => 2,
        }
    }
}

/// The evaluation phase that produced a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCategory {
    Compliance,
    Accuracy,
    Consistency,
    Anomaly,
}

/// A structured observation produced by rule or consistency evaluation.
/// Read-only once the analyzer emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub severity: Severity,
    /// Name of the data point (or derived quantity) the finding is about.
    pub data_point: String,
    pub description: String,
    pub evidence: String,
    pub suggested_action: String,
}

/// Outcome of rule evaluation for a single data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataPointStatus {
    Passed,
    Warning,
    Failed,
}

/// A parsed data point together with its rule-evaluation status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedDataPoint {
    pub point: DataPoint,
    pub status: DataPointStatus,
}

/// Recommended validation status for the product, derived from the
/// analysis. Never persisted independently of the result that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedStatus {
    Approved,
    Partial,
    Rejected,
    /// Below-threshold confidence; requires manual review.
    Pending,
}

/// Immutable record of one automated analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub algorithm: String,
    pub version: String,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    /// 0-100 score summarizing how much automatic trust to place in the
    /// result.
    pub confidence: u8,
    pub processing_time_ms: u64,
}

impl AnalysisResult {
    /// Human-readable digest of the run: confidence, timing, findings by
    /// category, and the leading recommendations.
    pub fn summary(&self) -> String {
        let mut by_category: BTreeMap<FindingCategory, usize> = BTreeMap::new();
        for finding in &self.findings {
            *by_category.entry(finding.category).or_default() += 1;
        }

        let mut lines = vec![
            format!(
                "Automated validation completed with {}% confidence.",
                self.confidence
            ),
            format!(
                "Processed in {}ms using {} v{}.",
                self.processing_time_ms, self.algorithm, self.version
            ),
        ];

        if !by_category.is_empty() {
            lines.push(String::new());
            lines.push("Findings Summary:".to_string());
            for (category, count) in &by_category {
                lines.push(format!("- {}: {} issue(s)", category, count));
            }
        }

        if !self.recommendations.is_empty() {
            lines.push(String::new());
            lines.push("Key Recommendations:".to_string());
            for (idx, rec) in self.recommendations.iter().take(3).enumerate() {
                lines.push(format!("{}. {}", idx + 1, rec));
            }
        }

        lines.join("\n")
    }
}
