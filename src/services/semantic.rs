//! Built-in rule-based semantic matcher.
//!
//! Pairs a claim with the report data point whose name is closest under
//! Jaro-Winkler similarity, weighted with unit compatibility. Entirely
//! deterministic, so retries are safe. Hosts that prefer an
//! embedding-based or remote-model matcher implement
//! [`SemanticMatcher`] themselves.

use async_trait::async_trait;
use strsim::jaro_winkler;

use crate::error::ValidationError;
use crate::models::claim::Claim;
use crate::models::report::DataPoint;
use crate::sources::{SemanticMatch, SemanticMatcher};

/// Minimum name similarity for a data point to be considered at all.
const NAME_MATCH_THRESHOLD: f64 = 0.80;

/// Scoring weights: name similarity dominates, unit agreement refines.
const NAME_WEIGHT: f64 = 0.8;
const UNIT_WEIGHT: f64 = 0.2;

pub struct JaroWinklerMatcher {
    name_threshold: f64,
}

impl Default for JaroWinklerMatcher {
    fn default() -> Self {
        Self {
            name_threshold: NAME_MATCH_THRESHOLD,
        }
    }
}

impl JaroWinklerMatcher {
    pub fn with_threshold(name_threshold: f64) -> Self {
        Self { name_threshold }
    }

    fn unit_score(claim: &Claim, point: &DataPoint) -> f64 {
        match claim.unit.as_deref() {
            // A claim without a unit cannot disagree with the report.
            None => 1.0,
            Some(unit) if unit.eq_ignore_ascii_case(&point.unit) => 1.0,
            Some(_) if point.unit.is_empty() => 0.5,
            Some(_) => 0.0,
        }
    }
}

#[async_trait]
impl SemanticMatcher for JaroWinklerMatcher {
    async fn best_match(
        &self,
        claim: &Claim,
        data_points: &[DataPoint],
    ) -> Result<Option<SemanticMatch>, ValidationError> {
        let claim_name = claim.name.to_lowercase();

        let mut best_score = 0.0_f64;
        let mut best: Option<&DataPoint> = None;

        for point in data_points {
            let name_sim = jaro_winkler(&claim_name, &point.name.to_lowercase());
            if name_sim < self.name_threshold {
                continue;
            }

            let score = name_sim * NAME_WEIGHT + Self::unit_score(claim, point) * UNIT_WEIGHT;
            if score > best_score {
                best_score = score;
                best = Some(point);
            }
        }

        Ok(best.map(|point| SemanticMatch {
            data_point: point.clone(),
            confidence: best_score,
            remarks: format!("matched '{}' by name similarity", point.name),
        }))
    }
}
