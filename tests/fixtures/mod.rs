//! Canned laboratory report payloads for integration tests.

#![allow(dead_code)]

use label_validate::models::report::ReportPayload;
use serde_json::json;

/// Internally consistent report: macronutrients sum to 80% and declared
/// calories match the derived estimate exactly. Produces no findings.
pub fn clean_report() -> ReportPayload {
    serde_json::from_value(json!({
        "nutritional": {
            "protein": { "value": 20.0, "unit": "g" },
            "fat": { "value": 10.0, "unit": "g" },
            "carbohydrates": { "value": 50.0, "unit": "g" },
            "calories": { "value": 370.0, "unit": "kcal" }
        },
        "claims": ["high protein"],
        "certifications": []
    }))
    .expect("fixture payload deserializes")
}

/// Single microbiological count above its limit (rule max = 100 CFU/g).
pub fn coliform_report() -> ReportPayload {
    serde_json::from_value(json!({
        "microbiological": {
            "coliformCount": { "value": 150.0, "unit": "CFU/g" }
        }
    }))
    .expect("fixture payload deserializes")
}

/// Macronutrients summing to 120% — triggers the consistency check.
pub fn inconsistent_report() -> ReportPayload {
    serde_json::from_value(json!({
        "nutritional": {
            "protein": { "value": 40.0, "unit": "g" },
            "fat": { "value": 40.0, "unit": "g" },
            "carbohydrates": { "value": 40.0, "unit": "g" }
        }
    }))
    .expect("fixture payload deserializes")
}

/// Report whose sodium level sits above the warning threshold but within
/// range, alongside clean macronutrients.
pub fn warning_report() -> ReportPayload {
    serde_json::from_value(json!({
        "nutritional": {
            "sodium": { "value": 3000.0, "unit": "mg" }
        }
    }))
    .expect("fixture payload deserializes")
}
