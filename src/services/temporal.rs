//! Flags drift across a product's validation history and contradictions
//! not visible within a single report. Consulted by the pipeline only
//! when historical validations exist.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::anomaly::{Anomaly, AnomalyReport, AnomalySeverity, AnomalyType};
use crate::models::claim::{Claim, ClaimMatch, ClaimType};
use crate::models::report::parse_numeric;
use crate::services::analyzer::ReportAnalysis;
use crate::sources::ValidationRecord;

/// Relative change between consecutive validations above which a claim
/// value is considered to have drifted.
const DRIFT_LIMIT: f64 = 0.2;

/// Allowed relative deviation between declared calories and the
/// macronutrient-derived estimate.
const CALORIE_DEVIATION_LIMIT: f64 = 0.1;

#[derive(Debug, Default)]
pub struct TemporalAnomalyDetector;

impl TemporalAnomalyDetector {
    pub fn detect(
        &self,
        analysis: &ReportAnalysis,
        claims: &[Claim],
        matches: &[ClaimMatch],
        history: &[ValidationRecord],
    ) -> AnomalyReport {
        let mut anomalies = Vec::new();

        anomalies.extend(self.value_anomalies(analysis));
        anomalies.extend(self.temporal_anomalies(matches, history));
        anomalies.extend(self.consistency_anomalies(analysis, claims));

        let risk_score = risk_score(&anomalies);
        let recommendations = recommendations(&anomalies);

        debug!(
            anomalies = anomalies.len(),
            risk_score, "anomaly detection complete"
        );

        AnomalyReport {
            anomalies,
            risk_score,
            recommendations,
        }
    }

    /// Value-range sanity over the current report, re-applied here with
    /// the historical context available.
    fn value_anomalies(&self, analysis: &ReportAnalysis) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        let value_of = |name: &str| {
            analysis
                .data_points
                .iter()
                .find(|e| e.point.name.eq_ignore_ascii_case(name))
                .and_then(|e| e.point.value.as_f64())
        };

        let protein = value_of("protein").unwrap_or(0.0);
        let fat = value_of("fat").unwrap_or(0.0);
        let carbs = value_of("carbohydrates").unwrap_or(0.0);

        if let Some(calories) = value_of("calories") {
            let expected = protein * 4.0 + carbs * 4.0 + fat * 9.0;
            if calories > 0.0 && expected > 0.0 {
                let deviation = (expected - calories).abs() / calories;
                if deviation > CALORIE_DEVIATION_LIMIT {
                    anomalies.push(Anomaly {
                        kind: AnomalyType::Value,
                        severity: AnomalySeverity::High,
                        description: "Calorie count does not match macronutrient profile"
                            .to_string(),
                        recommendation: "Verify nutritional calculations".to_string(),
                    });
                }
            }
        }

        if protein > 100.0 || fat > 100.0 || carbs > 100.0 {
            anomalies.push(Anomaly {
                kind: AnomalyType::Value,
                severity: AnomalySeverity::Critical,
                description: "Nutritional values exceed 100g per serving".to_string(),
                recommendation: "Review serving size and nutritional data".to_string(),
            });
        }

        anomalies
    }

    /// Compare each claim's matched value with the immediately prior
    /// validation of the same claim.
    fn temporal_anomalies(
        &self,
        matches: &[ClaimMatch],
        history: &[ValidationRecord],
    ) -> Vec<Anomaly> {
        let Some(previous) = history.first() else {
            return Vec::new();
        };

        let mut anomalies = Vec::new();
        for current in matches {
            let Some(current_value) = current
                .matched
                .as_ref()
                .and_then(|p| p.value.as_f64())
            else {
                continue;
            };
            let Some(previous_value) = previous
                .matches
                .iter()
                .find(|m| m.claim_id == current.claim_id)
                .and_then(|m| m.matched.as_ref())
                .and_then(|p| p.value.as_f64())
            else {
                continue;
            };
            if previous_value == 0.0 {
                continue;
            }

            let change = (current_value - previous_value).abs() / previous_value.abs();
            if change > DRIFT_LIMIT {
                anomalies.push(Anomaly {
                    kind: AnomalyType::Temporal,
                    severity: AnomalySeverity::Medium,
                    description: format!(
                        "Significant change in {} value ({:.1}%)",
                        current.claim_name,
                        change * 100.0
                    ),
                    recommendation: "Investigate formula or testing methodology changes"
                        .to_string(),
                });
            }
        }

        anomalies
    }

    /// Known contradictory claim pairs.
    fn consistency_anomalies(&self, analysis: &ReportAnalysis, claims: &[Claim]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        let claims_organic = claims.iter().any(|c| {
            c.claim_type == ClaimType::Certification && c.value.to_lowercase().contains("organic")
        }) || analysis
            .certifications
            .iter()
            .any(|c| c.to_lowercase().contains("organic"));

        let has_pesticide_residue = claims
            .iter()
            .any(|c| {
                c.claim_type == ClaimType::Pesticide
                    && parse_numeric(&c.value).is_some_and(|v| v > 0.0)
            })
            || analysis.data_points.iter().any(|e| {
                e.point.name.to_lowercase().contains("pesticide")
                    && e.point.value.as_f64().is_some_and(|v| v > 0.0)
            });

        if claims_organic && has_pesticide_residue {
            anomalies.push(Anomaly {
                kind: AnomalyType::Consistency,
                severity: AnomalySeverity::High,
                description: "Product claims organic certification but has pesticide residues"
                    .to_string(),
                recommendation: "Review organic certification status".to_string(),
            });
        }

        let claims_gluten_free = claims.iter().any(|c| {
            let name = c.name.to_lowercase();
            name.contains("gluten-free") || name.contains("gluten free")
        });
        let contains_wheat = analysis
            .ingredients
            .iter()
            .any(|i| i.to_lowercase().contains("wheat"));

        if claims_gluten_free && contains_wheat {
            anomalies.push(Anomaly {
                kind: AnomalyType::Consistency,
                severity: AnomalySeverity::Critical,
                description: "Product claims gluten-free but contains wheat".to_string(),
                recommendation: "Urgent review required for allergen claims".to_string(),
            });
        }

        anomalies
    }
}

/// Mean of severity weights, capped at 1.0; zero when nothing was found.
fn risk_score(anomalies: &[Anomaly]) -> f64 {
    if anomalies.is_empty() {
        return 0.0;
    }
    let total: f64 = anomalies.iter().map(|a| a.severity.weight()).sum();
    (total / anomalies.len() as f64).min(1.0)
}

/// Per-anomaly recommendations plus general advice per anomaly type,
/// deduplicated with deterministic ordering.
fn recommendations(anomalies: &[Anomaly]) -> Vec<String> {
    let mut set = BTreeSet::new();

    for anomaly in anomalies {
        set.insert(anomaly.recommendation.clone());
    }

    let has = |kind| anomalies.iter().any(|a| a.kind == kind);
    if has(AnomalyType::Value) {
        set.insert("Schedule comprehensive laboratory re-testing".to_string());
    }
    if has(AnomalyType::Temporal) {
        set.insert("Document any recent formula or process changes".to_string());
    }
    if has(AnomalyType::Consistency) {
        set.insert("Review all product claims and certifications".to_string());
    }

    set.into_iter().collect()
}
