use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analyte::NormalizedAnalyte;
use super::enums::Sex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub sex: Sex,
    pub birth_year: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
}

/// One lab value as entered (or reviewed) by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabEntry {
    pub analyte: String,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_high: Option<f64>,
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub demographics: Demographics,
    pub lab_results: Vec<LabEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub demographics: Demographics,
    pub raw_entries: Vec<LabEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub t: String,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub key: String,
    #[serde(default)]
    pub points: Vec<ChartPoint>,
}

/// The educational analysis attached to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_summary: String,
    pub overall_score: f64,
    pub flags: Vec<String>,
    pub analytes: Vec<NormalizedAnalyte>,
    pub chart_series: Vec<ChartSeries>,
    pub disclaimers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub created_at: String,
    pub result_json: AnalysisResult,
}
