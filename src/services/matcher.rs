//! Decides, per declared product claim, whether the laboratory report
//! substantiates it.
//!
//! The search for a matching data point is delegated to the injected
//! [`SemanticMatcher`]; this component interprets the match through the
//! category tolerance bands and produces the per-claim records.

use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::models::claim::{Claim, ClaimMatch, ClaimType, MatchStatus};
use crate::models::report::{parse_numeric, DataPoint};
use crate::sources::SemanticMatcher;

pub struct ClaimMatcher {
    semantic: Arc<dyn SemanticMatcher>,
    nutritional_tolerance: f64,
    default_tolerance: f64,
}

impl ClaimMatcher {
    pub fn new(semantic: Arc<dyn SemanticMatcher>, config: &EngineConfig) -> Self {
        Self {
            semantic,
            nutritional_tolerance: config.nutritional_tolerance,
            default_tolerance: config.default_tolerance,
        }
    }

    pub async fn match_claims(
        &self,
        claims: &[Claim],
        data_points: &[DataPoint],
    ) -> Result<Vec<ClaimMatch>, ValidationError> {
        let mut matches = Vec::with_capacity(claims.len());

        for claim in claims {
            let matched = self.semantic.best_match(claim, data_points).await?;
            let record = match matched {
                Some(m) => {
                    let status = self.status_for(claim, &m.data_point);
                    debug!(
                        claim = %claim.name,
                        data_point = %m.data_point.name,
                        confidence = m.confidence,
                        status = %status,
                        "claim matched"
                    );
                    ClaimMatch {
                        claim_id: claim.id,
                        claim_name: claim.name.clone(),
                        matched: Some(m.data_point),
                        confidence: m.confidence,
                        status,
                        remarks: m.remarks,
                    }
                }
                None => ClaimMatch {
                    claim_id: claim.id,
                    claim_name: claim.name.clone(),
                    matched: None,
                    confidence: 0.0,
                    status: MatchStatus::NotValidated,
                    remarks: "No matching data found in laboratory report".to_string(),
                },
            };
            matches.push(record);
        }

        Ok(matches)
    }

    /// Pure function of (claim value, matched value, category tolerance).
    fn status_for(&self, claim: &Claim, point: &DataPoint) -> MatchStatus {
        let (Some(claim_value), Some(measured)) =
            (parse_numeric(&claim.value), point.value.as_f64())
        else {
            return MatchStatus::NotApplicable;
        };

        // A zero claim cannot anchor a relative band; require equality.
        if claim_value == 0.0 {
            return if measured == 0.0 {
                MatchStatus::Validated
            } else {
                MatchStatus::NotValidated
            };
        }

        let tolerance = match claim.claim_type {
            ClaimType::Nutritional => self.nutritional_tolerance,
            _ => self.default_tolerance,
        };
        let diff = (claim_value - measured).abs() / claim_value.abs();

        if diff <= tolerance {
            MatchStatus::Validated
        } else if diff <= tolerance * 2.0 {
            MatchStatus::ValidatedWithRemarks
        } else {
            MatchStatus::NotValidated
        }
    }
}
