//! Turns a structured report payload into data points and findings.
//!
//! Pure with respect to its input: analyzing the same payload twice
//! yields identical data points and findings.

use garde::Validate;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::finding::{
    DataPointStatus, EvaluatedDataPoint, Finding, FindingCategory, Severity,
};
use crate::models::report::{DataPoint, ReportPayload};
use crate::services::rules::{RuleOutcome, RuleSet};

/// Allowed relative deviation between declared calories and the
/// macronutrient-derived estimate, in percent.
const CALORIE_DEVIATION_LIMIT: f64 = 10.0;

/// Decimal digits beyond which a value is flagged as suspiciously precise.
const PRECISION_LIMIT: usize = 4;

/// Values labs commonly leave behind as placeholders.
const PLACEHOLDER_VALUES: &[f64] = &[0.0, 999.0, 9999.0];

/// Everything the analyzer extracts from one report.
#[derive(Debug, Clone)]
pub struct ReportAnalysis {
    pub data_points: Vec<EvaluatedDataPoint>,
    pub findings: Vec<Finding>,
    /// Claims asserted inside the report itself, verbatim.
    pub claims: Vec<String>,
    pub certifications: Vec<String>,
    pub ingredients: Vec<String>,
}

impl ReportAnalysis {
    /// The parsed data points without their evaluation status.
    pub fn points(&self) -> Vec<DataPoint> {
        self.data_points.iter().map(|e| e.point.clone()).collect()
    }
}

pub struct ReportAnalyzer {
    rules: RuleSet,
}

impl Default for ReportAnalyzer {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

impl ReportAnalyzer {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Flatten the payload into data points and evaluate them: rule
    /// checks first, then cross-field consistency, then in-report
    /// anomaly checks. Findings are grouped by the phase that produced
    /// them.
    pub fn analyze(&self, payload: &ReportPayload) -> Result<ReportAnalysis, ValidationError> {
        payload
            .validate()
            .map_err(|e| ValidationError::MalformedReport(e.to_string()))?;

        let points = payload.data_points();
        if points.is_empty() {
            return Err(ValidationError::MalformedReport(
                "report contains no measurements".to_string(),
            ));
        }

        let mut findings = Vec::new();
        let mut evaluated = Vec::with_capacity(points.len());

        for point in &points {
            let (status, finding) = self.evaluate_point(point);
            if let Some(finding) = finding {
                findings.push(finding);
            }
            evaluated.push(EvaluatedDataPoint {
                point: point.clone(),
                status,
            });
        }

        findings.extend(self.consistency_findings(&points));
        findings.extend(self.anomaly_findings(&points));

        debug!(
            data_points = points.len(),
            findings = findings.len(),
            "report analysis complete"
        );

        Ok(ReportAnalysis {
            data_points: evaluated,
            findings,
            claims: payload.claims.clone(),
            certifications: payload.certifications.clone(),
            ingredients: payload.ingredients.clone(),
        })
    }

    fn evaluate_point(&self, point: &DataPoint) -> (DataPointStatus, Option<Finding>) {
        match self.rules.evaluate(point) {
            RuleOutcome::Passed => (DataPointStatus::Passed, None),
            RuleOutcome::Warning { limit } => (
                DataPointStatus::Warning,
                Some(Finding {
                    category: FindingCategory::Accuracy,
                    severity: Severity::Medium,
                    data_point: point.name.clone(),
                    description: format!(
                        "Value approaching upper limit ({} {})",
                        limit, point.unit
                    ),
                    evidence: evidence_for(point),
                    suggested_action: "Monitor this parameter closely".to_string(),
                }),
            ),
            RuleOutcome::Failed => (
                DataPointStatus::Failed,
                Some(Finding {
                    category: FindingCategory::Compliance,
                    severity: Severity::High,
                    data_point: point.name.clone(),
                    description: format!(
                        "Value {} {} does not meet requirements",
                        point.value, point.unit
                    ),
                    evidence: evidence_for(point),
                    suggested_action: "Review and update product formulation or retest"
                        .to_string(),
                }),
            ),
        }
    }

    fn consistency_findings(&self, points: &[DataPoint]) -> Vec<Finding> {
        let mut findings = Vec::new();

        let protein = numeric_value(points, "protein").unwrap_or(0.0);
        let fat = numeric_value(points, "fat").unwrap_or(0.0);
        let carbs = numeric_value(points, "carbohydrates").unwrap_or(0.0);

        let macro_sum = protein + fat + carbs;
        if macro_sum > 100.0 {
            findings.push(Finding {
                category: FindingCategory::Consistency,
                severity: Severity::High,
                data_point: "macronutrients".to_string(),
                description: format!(
                    "Sum of macronutrients ({:.1}%) exceeds 100%",
                    macro_sum
                ),
                evidence: format!(
                    "Protein: {}%, Fat: {}%, Carbs: {}%",
                    protein, fat, carbs
                ),
                suggested_action: "Verify analytical methods and recalculate values".to_string(),
            });
        }

        // Calorie cross-check runs only when the report declares calories
        // and the macronutrient estimate is positive.
        let expected = protein * 4.0 + carbs * 4.0 + fat * 9.0;
        if expected > 0.0 {
            if let Some(calories) = numeric_value(points, "calories") {
                let deviation = (calories - expected).abs() / expected * 100.0;
                if deviation > CALORIE_DEVIATION_LIMIT {
                    findings.push(Finding {
                        category: FindingCategory::Consistency,
                        severity: Severity::Medium,
                        data_point: "calories".to_string(),
                        description: format!(
                            "Caloric value deviates {:.1}% from expected",
                            deviation
                        ),
                        evidence: format!(
                            "Reported: {} kcal, Expected: {:.0} kcal",
                            calories, expected
                        ),
                        suggested_action: "Verify caloric calculation method".to_string(),
                    });
                }
            }
        }

        findings
    }

    fn anomaly_findings(&self, points: &[DataPoint]) -> Vec<Finding> {
        let mut findings = Vec::new();

        for point in points {
            if point.value.decimal_digits() > PRECISION_LIMIT {
                findings.push(Finding {
                    category: FindingCategory::Anomaly,
                    severity: Severity::Low,
                    data_point: point.name.clone(),
                    description: "Unusually precise value detected".to_string(),
                    evidence: format!("Value: {}", point.value),
                    suggested_action: "Verify measurement precision and rounding rules"
                        .to_string(),
                });
            }

            if let Some(value) = point.value.as_f64() {
                if PLACEHOLDER_VALUES.contains(&value) {
                    findings.push(Finding {
                        category: FindingCategory::Anomaly,
                        severity: Severity::Medium,
                        data_point: point.name.clone(),
                        description: "Potential placeholder value detected".to_string(),
                        evidence: format!("Value: {}", point.value),
                        suggested_action: "Confirm this is the actual measured value"
                            .to_string(),
                    });
                }
            }
        }

        findings
    }
}

fn evidence_for(point: &DataPoint) -> String {
    serde_json::to_string(point).unwrap_or_else(|_| point.name.clone())
}

fn numeric_value(points: &[DataPoint], name: &str) -> Option<f64> {
    points
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .and_then(|p| p.value.as_f64())
}
