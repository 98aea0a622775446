use std::collections::BTreeMap;
use std::fmt;

use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A measured value as it appears in a laboratory report: numeric where
/// the lab quantified it, free text otherwise ("absent", "not detected").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasuredValue {
    Number(f64),
    Text(String),
}

impl MeasuredValue {
    /// Numeric view of the value. Text values are parsed after stripping
    /// unit characters, so "12.5 g" reads as 12.5; "absent" reads as none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_numeric(s),
        }
    }

    /// Number of digits after the decimal point in the value's canonical
    /// rendering. Zero for text that carries no decimal point.
    pub fn decimal_digits(&self) -> usize {
        let rendered = self.to_string();
        rendered
            .split_once('.')
            .map(|(_, frac)| frac.chars().take_while(|c| c.is_ascii_digit()).count())
            .unwrap_or(0)
    }
}

impl fmt::Display for MeasuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Extract a numeric value from free text by dropping everything that is
/// not a digit, decimal point, or sign.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One entry of a report section. Labs report either a bare value or a
/// `{value, unit}` object; both shapes deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMeasurement {
    Detailed {
        value: MeasuredValue,
        #[serde(default)]
        unit: Option<String>,
    },
    Bare(MeasuredValue),
}

impl RawMeasurement {
    fn value(&self) -> &MeasuredValue {
        match self {
            Self::Detailed { value, .. } => value,
            Self::Bare(value) => value,
        }
    }

    fn unit(&self) -> Option<&str> {
        match self {
            Self::Detailed { unit, .. } => unit.as_deref(),
            Self::Bare(_) => None,
        }
    }
}

/// Sample metadata accompanying a laboratory report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SampleInfo {
    #[garde(inner(length(min = 1, max = 100)))]
    pub collection_date: Option<String>,

    #[garde(inner(length(min = 1, max = 100)))]
    pub batch_number: Option<String>,

    #[garde(inner(length(min = 1, max = 100)))]
    pub test_date: Option<String>,
}

/// Structured laboratory report payload, as delivered by the external
/// report store. Section maps are keyed by parameter name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReportPayload {
    #[serde(default)]
    #[garde(skip)]
    pub nutritional: BTreeMap<String, RawMeasurement>,

    #[serde(default)]
    #[garde(skip)]
    pub chemical: BTreeMap<String, RawMeasurement>,

    #[serde(default)]
    #[garde(skip)]
    pub microbiological: BTreeMap<String, RawMeasurement>,

    /// Claims asserted inside the report itself, as plain text.
    #[serde(default)]
    #[garde(skip)]
    pub claims: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub certifications: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub test_methods: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub ingredients: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(dive)]
    pub sample_info: Option<SampleInfo>,
}

impl ReportPayload {
    /// Flatten the report sections into data points, carrying each value
    /// with its declared unit. Microbiological counts default to CFU/g
    /// when the lab omits the unit.
    pub fn data_points(&self) -> Vec<DataPoint> {
        let mut points = Vec::new();
        for (name, m) in &self.nutritional {
            points.push(DataPoint::from_raw(name, m, DataPointCategory::Nutritional, ""));
        }
        for (name, m) in &self.chemical {
            points.push(DataPoint::from_raw(name, m, DataPointCategory::Chemical, ""));
        }
        for (name, m) in &self.microbiological {
            points.push(DataPoint::from_raw(name, m, DataPointCategory::Microbiological, "CFU/g"));
        }
        points
    }
}

/// Category of a data point, derived from the report section it came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataPointCategory {
    Nutritional,
    Chemical,
    Microbiological,
    Other,
}

/// A single named, valued, unit-tagged measurement extracted from a
/// laboratory report. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub name: String,
    pub value: MeasuredValue,
    pub unit: String,
    pub category: DataPointCategory,
}

impl DataPoint {
    fn from_raw(
        name: &str,
        raw: &RawMeasurement,
        category: DataPointCategory,
        fallback_unit: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            value: raw.value().clone(),
            unit: raw.unit().unwrap_or(fallback_unit).to_string(),
            category,
        }
    }
}
