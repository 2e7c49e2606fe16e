use serde::{Deserialize, Serialize};

use super::enums::{AnalyteStatus, ExtractionMethod, ExtractionQuality};

/// A loosely typed scalar as returned by the model: either a JSON number or
/// free text that still needs numeric normalization ("17,9", "↑95 mg/dL").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

/// One analyte row as produced by the extraction backend, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnalyteCandidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<RawValue>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub ref_low: Option<RawValue>,
    #[serde(default)]
    pub ref_high: Option<RawValue>,
    /// Present only when an upstream source already classified the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Informational document header fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub lab_name: Option<String>,
    #[serde(default)]
    pub collection_date: Option<String>,
}

/// A complete candidate returned by one extraction attempt.
/// Never mutated after creation; the orchestrator selects among whole results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtractionResult {
    #[serde(default)]
    pub document_meta: DocumentMeta,
    #[serde(default)]
    pub analytes: Vec<RawAnalyteCandidate>,
}

impl RawExtractionResult {
    pub fn analyte_count(&self) -> usize {
        self.analytes.len()
    }
}

/// Canonical, validated analyte record. `value` is always finite and `name`
/// never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnalyte {
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub ref_low: Option<f64>,
    pub ref_high: Option<f64>,
    pub status: AnalyteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMeta {
    pub extraction_quality: ExtractionQuality,
    pub analyte_count: usize,
    pub text_length: usize,
}

/// Final result of one extraction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub document_meta: DocumentMeta,
    pub analytes: Vec<NormalizedAnalyte>,
    pub extraction_method: ExtractionMethod,
    pub extraction_meta: ExtractionMeta,
}
