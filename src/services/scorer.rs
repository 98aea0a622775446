//! Reduces a findings sequence to a confidence value, recommendations,
//! and a recommended validation status.

use crate::config::EngineConfig;
use crate::models::finding::{
    DataPointStatus, EvaluatedDataPoint, Finding, FindingCategory, RecommendedStatus, Severity,
};
use crate::services::analyzer::ReportAnalysis;

/// The scorer's verdict on one analysis.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub confidence: u8,
    pub recommendations: Vec<String>,
    pub status: RecommendedStatus,
}

pub struct ConfidenceScorer {
    threshold: u8,
    warning_ratio: f64,
}

impl ConfidenceScorer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
            warning_ratio: config.warning_ratio,
        }
    }

    pub fn assess(&self, analysis: &ReportAnalysis) -> Assessment {
        let confidence = self.confidence(&analysis.findings);
        Assessment {
            confidence,
            recommendations: self.recommendations(&analysis.findings),
            status: self.status(&analysis.data_points, confidence),
        }
    }

    /// `max(0, 100 − Σ severity weight)`. Empty findings score 100.
    pub fn confidence(&self, findings: &[Finding]) -> u8 {
        let penalty: i64 = findings
            .iter()
            .map(|f| i64::from(f.severity.weight()))
            .sum();
        (100 - penalty).clamp(0, 100) as u8
    }

    /// Small rule set over finding counts and categories; one affirmative
    /// recommendation when nothing was found.
    pub fn recommendations(&self, findings: &[Finding]) -> Vec<String> {
        let mut recommendations = Vec::new();

        let high = findings.iter().filter(|f| f.severity == Severity::High).count();
        let medium = findings
            .iter()
            .filter(|f| f.severity == Severity::Medium)
            .count();

        if high > 0 {
            recommendations.push(format!(
                "Address {} critical compliance issues before approval",
                high
            ));
        }
        if medium > 0 {
            recommendations.push(format!(
                "Review {} moderate issues for potential improvement",
                medium
            ));
        }

        let has = |category| findings.iter().any(|f| f.category == category);
        if has(FindingCategory::Consistency) {
            recommendations.push(
                "Implement data validation checks to ensure consistency across measurements"
                    .to_string(),
            );
        }
        if has(FindingCategory::Anomaly) {
            recommendations.push(
                "Review data collection and entry procedures to prevent anomalies".to_string(),
            );
        }
        if has(FindingCategory::Compliance) {
            recommendations.push(
                "Consider reformulation or additional testing to meet compliance requirements"
                    .to_string(),
            );
        }

        if recommendations.is_empty() {
            recommendations.push(
                "Product meets all validation criteria. Continue with regular monitoring."
                    .to_string(),
            );
        }

        recommendations
    }

    /// Status mapping consumed by the queue. A failed data point rejects
    /// outright; otherwise confidence gates manual review, then the
    /// warning ratio decides between partial and full approval.
    pub fn status(&self, data_points: &[EvaluatedDataPoint], confidence: u8) -> RecommendedStatus {
        let failed = data_points
            .iter()
            .filter(|d| d.status == DataPointStatus::Failed)
            .count();
        if failed > 0 {
            return RecommendedStatus::Rejected;
        }

        if confidence < self.threshold {
            return RecommendedStatus::Pending;
        }

        let warnings = data_points
            .iter()
            .filter(|d| d.status == DataPointStatus::Warning)
            .count();
        if (warnings as f64) > (data_points.len() as f64) * self.warning_ratio {
            return RecommendedStatus::Partial;
        }

        RecommendedStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{DataPoint, DataPointCategory, MeasuredValue};

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(&EngineConfig::default())
    }

    fn finding(severity: Severity) -> Finding {
        Finding {
            category: FindingCategory::Compliance,
            severity,
            data_point: "x".into(),
            description: String::new(),
            evidence: String::new(),
            suggested_action: String::new(),
        }
    }

    fn evaluated(status: DataPointStatus) -> EvaluatedDataPoint {
        EvaluatedDataPoint {
            point: DataPoint {
                name: "x".into(),
                value: MeasuredValue::Number(1.0),
                unit: "g".into(),
                category: DataPointCategory::Nutritional,
            },
            status,
        }
    }

    #[test]
    fn empty_findings_score_100() {
        assert_eq!(scorer().confidence(&[]), 100);
    }

    #[test]
    fn weights_accumulate() {
        let findings = vec![
            finding(Severity::High),
            finding(Severity::Medium),
            finding(Severity::Low),
            finding(Severity::Info),
        ];
        assert_eq!(scorer().confidence(&findings), 100 - 20 - 10 - 5 - 2);
    }

    #[test]
    fn confidence_never_goes_negative() {
        let findings: Vec<_> = (0..10).map(|_| finding(Severity::High)).collect();
        assert_eq!(scorer().confidence(&findings), 0);
    }

    #[test]
    fn adding_a_finding_never_increases_confidence() {
        let s = scorer();
        let mut findings = Vec::new();
        let mut previous = s.confidence(&findings);
        for severity in [Severity::Info, Severity::Low, Severity::Medium, Severity::High] {
            findings.push(finding(severity));
            let current = s.confidence(&findings);
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn failed_data_point_rejects_regardless_of_confidence() {
        let points = vec![evaluated(DataPointStatus::Failed)];
        assert_eq!(scorer().status(&points, 100), RecommendedStatus::Rejected);
    }

    #[test]
    fn low_confidence_pends_for_review() {
        let points = vec![evaluated(DataPointStatus::Passed)];
        assert_eq!(scorer().status(&points, 80), RecommendedStatus::Pending);
    }

    #[test]
    fn warning_ratio_over_30_percent_is_partial() {
        let points = vec![
            evaluated(DataPointStatus::Warning),
            evaluated(DataPointStatus::Passed),
        ];
        assert_eq!(scorer().status(&points, 90), RecommendedStatus::Partial);
    }

    #[test]
    fn clean_points_with_high_confidence_approve() {
        let points = vec![
            evaluated(DataPointStatus::Passed),
            evaluated(DataPointStatus::Passed),
        ];
        assert_eq!(scorer().status(&points, 100), RecommendedStatus::Approved);
    }

    #[test]
    fn no_findings_yields_affirmative_recommendation() {
        let recs = scorer().recommendations(&[]);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("meets all validation criteria"));
    }

    #[test]
    fn category_hints_are_included() {
        let findings = vec![
            Finding {
                category: FindingCategory::Consistency,
                ..finding(Severity::High)
            },
            Finding {
                category: FindingCategory::Anomaly,
                ..finding(Severity::Low)
            },
        ];
        let recs = scorer().recommendations(&findings);
        assert!(recs.iter().any(|r| r.contains("consistency across measurements")));
        assert!(recs.iter().any(|r| r.contains("prevent anomalies")));
    }
}
