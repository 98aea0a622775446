//! Per-parameter acceptance rules.
//!
//! The thresholds are configuration, not invariants: the defaults below
//! reproduce the reference table used by the certification workflow
//! (per-100g basis for nutritional parameters, CFU/g for microbiology),
//! and callers may replace or extend them freely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::report::DataPoint;

/// Acceptance band for one named parameter. A value below `min` or above
/// `max` fails; a value above `warning` (but within range) warns.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParameterRule {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub warning: Option<f64>,
}

impl ParameterRule {
    pub const fn new(min: Option<f64>, max: Option<f64>, warning: Option<f64>) -> Self {
        Self { min, max, warning }
    }
}

/// Result of evaluating a data point against its rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleOutcome {
    Passed,
    /// Within range but above the warning threshold.
    Warning { limit: f64 },
    Failed,
}

/// Case-insensitive table of parameter rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: HashMap<String, ParameterRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let mut set = Self {
            rules: HashMap::new(),
        };
        set.insert("protein", ParameterRule::new(Some(0.0), Some(100.0), Some(90.0)));
        set.insert("fat", ParameterRule::new(Some(0.0), Some(100.0), Some(90.0)));
        set.insert(
            "carbohydrates",
            ParameterRule::new(Some(0.0), Some(100.0), Some(90.0)),
        );
        set.insert("sodium", ParameterRule::new(Some(0.0), Some(5000.0), Some(2300.0)));
        set.insert("sugar", ParameterRule::new(Some(0.0), Some(100.0), Some(50.0)));
        set.insert("fiber", ParameterRule::new(Some(0.0), Some(100.0), None));
        set.insert("calories", ParameterRule::new(Some(0.0), Some(900.0), None));
        set.insert("coliformCount", ParameterRule::new(Some(0.0), Some(100.0), None));
        // Pathogens must be absent.
        set.insert("salmonella", ParameterRule::new(None, Some(0.0), None));
        set.insert("listeria", ParameterRule::new(None, Some(0.0), None));
        set
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, rule: ParameterRule) {
        self.rules.insert(name.to_lowercase(), rule);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterRule> {
        self.rules.get(&name.to_lowercase())
    }

    /// Evaluate a data point. Parameters without a rule, and non-numeric
    /// values, pass with full confidence.
    pub fn evaluate(&self, point: &DataPoint) -> RuleOutcome {
        let Some(rule) = self.get(&point.name) else {
            return RuleOutcome::Passed;
        };
        let Some(value) = point.value.as_f64() else {
            return RuleOutcome::Passed;
        };

        if let Some(min) = rule.min {
            if value < min {
                return RuleOutcome::Failed;
            }
        }
        if let Some(max) = rule.max {
            if value > max {
                return RuleOutcome::Failed;
            }
        }
        if let Some(warning) = rule.warning {
            if value > warning {
                return RuleOutcome::Warning { limit: warning };
            }
        }
        RuleOutcome::Passed
    }
}
