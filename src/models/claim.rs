use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::report::DataPoint;

/// Category of a declared product claim. Drives the tolerance band used
/// when comparing the claim against a measured value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Nutritional,
    Health,
    Certification,
    Pesticide,
    Allergen,
    Other,
}

/// A marketing/nutritional/health assertion declared by a brand for a
/// product, as delivered by the external claim-extraction service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Claim {
    #[garde(skip)]
    pub id: Uuid,

    #[garde(length(min = 1, max = 200))]
    pub name: String,

    #[garde(length(min = 1, max = 100))]
    pub value: String,

    #[garde(inner(length(min = 1, max = 50)))]
    pub unit: Option<String>,

    #[garde(skip)]
    pub claim_type: ClaimType,
}

/// Whether the laboratory report substantiates a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Validated,
    ValidatedWithRemarks,
    NotValidated,
    NotApplicable,
}

/// Per-claim validation record produced by the claim matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimMatch {
    pub claim_id: Uuid,
    pub claim_name: String,
    /// The report data point the claim was matched against, if any.
    pub matched: Option<DataPoint>,
    /// Match confidence reported by the semantic matcher, 0-1.
    pub confidence: f64,
    pub status: MatchStatus,
    pub remarks: String,
}

/// Aggregate counts across all claim matches of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub total: usize,
    pub validated: usize,
    pub validated_with_remarks: usize,
    pub not_validated: usize,
    pub not_applicable: usize,
}

impl MatchSummary {
    pub fn tally(matches: &[ClaimMatch]) -> Self {
        let mut summary = Self {
            total: matches.len(),
            ..Self::default()
        };
        for m in matches {
            match m.status {
                MatchStatus::Validated => summary.validated += 1,
                MatchStatus::ValidatedWithRemarks => summary.validated_with_remarks += 1,
                MatchStatus::NotValidated => summary.not_validated += 1,
                MatchStatus::NotApplicable => summary.not_applicable += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim_match(status: MatchStatus) -> ClaimMatch {
        ClaimMatch {
            claim_id: Uuid::new_v4(),
            claim_name: "protein".into(),
            matched: None,
            confidence: 0.9,
            status,
            remarks: String::new(),
        }
    }

    #[test]
    fn tally_counts_every_status() {
        let matches = vec![
            claim_match(MatchStatus::Validated),
            claim_match(MatchStatus::Validated),
            claim_match(MatchStatus::ValidatedWithRemarks),
            claim_match(MatchStatus::NotValidated),
            claim_match(MatchStatus::NotApplicable),
        ];
        let summary = MatchSummary::tally(&matches);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.validated, 2);
        assert_eq!(summary.validated_with_remarks, 1);
        assert_eq!(summary.not_validated, 1);
        assert_eq!(summary.not_applicable, 1);
    }

    #[test]
    fn claim_validation_rejects_empty_name() {
        let claim = Claim {
            id: Uuid::new_v4(),
            name: String::new(),
            value: "25".into(),
            unit: Some("g".into()),
            claim_type: ClaimType::Nutritional,
        };
        assert!(claim.validate().is_err());
    }
}
