use std::collections::HashSet;
use std::str::FromStr;

use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::models::{
    AnalyteStatus, ExtractionMeta, ExtractionMethod, ExtractionOutcome, ExtractionQuality,
    LabEntry, NormalizedAnalyte, RawAnalyteCandidate, RawExtractionResult,
};
use crate::pipeline::normalize::{normalize_name, parse_bound, parse_numeric_value};

/// Note attached to requested analytes the model left out.
pub const BACKFILL_NOTE: &str = "This value was included from your submitted results. \
Discuss it with your healthcare provider for a personalized interpretation.";

/// Classify `value` against an optional reference range.
///
/// Bounds are inclusive: a value equal to either bound is normal.
pub fn infer_status(value: f64, ref_low: Option<f64>, ref_high: Option<f64>) -> AnalyteStatus {
    if ref_low.is_none() && ref_high.is_none() {
        return AnalyteStatus::Unknown;
    }
    if ref_low.is_some_and(|low| value < low) {
        AnalyteStatus::Low
    } else if ref_high.is_some_and(|high| value > high) {
        AnalyteStatus::High
    } else {
        AnalyteStatus::Normal
    }
}

/// Three-tier quality label for observability.
pub fn quality_label(count: usize, comprehensive: usize, moderate: usize) -> ExtractionQuality {
    if count >= comprehensive {
        ExtractionQuality::Comprehensive
    } else if count >= moderate {
        ExtractionQuality::Moderate
    } else {
        ExtractionQuality::Limited
    }
}

/// Normalizes and validates a raw candidate result. Never fails: bad rows
/// are dropped and counted.
pub struct ResultPostProcessor {
    comprehensive_threshold: usize,
    moderate_threshold: usize,
}

impl ResultPostProcessor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            comprehensive_threshold: config.comprehensive_threshold,
            moderate_threshold: config.moderate_threshold,
        }
    }

    /// Produce the final outcome.
    ///
    /// When `requested` lists the analytes the caller asked about and the
    /// output has fewer rows, the missing ones (case-insensitive by name) are
    /// appended so the output covers every requested name.
    pub fn process(
        &self,
        raw: RawExtractionResult,
        requested: Option<&[LabEntry]>,
        text_length: usize,
        method: ExtractionMethod,
    ) -> ExtractionOutcome {
        let input_count = raw.analytes.len();
        let mut analytes: Vec<NormalizedAnalyte> =
            raw.analytes.into_iter().filter_map(normalize_row).collect();
        let dropped = input_count - analytes.len();

        let mut backfilled = 0;
        if let Some(requested) = requested {
            if analytes.len() < requested.len() {
                backfilled = backfill_missing(&mut analytes, requested);
            }
        }

        let analyte_count = analytes.len();
        let extraction_quality = quality_label(
            analyte_count,
            self.comprehensive_threshold,
            self.moderate_threshold,
        );

        info!(
            input = input_count,
            dropped,
            backfilled,
            analytes = analyte_count,
            quality = %extraction_quality,
            "Post-processing complete"
        );

        ExtractionOutcome {
            document_meta: raw.document_meta,
            analytes,
            extraction_method: method,
            extraction_meta: ExtractionMeta {
                extraction_quality,
                analyte_count,
                text_length,
            },
        }
    }
}

/// Normalize one row; `None` when it has no name or no finite value.
fn normalize_row(candidate: RawAnalyteCandidate) -> Option<NormalizedAnalyte> {
    let name = normalize_name(candidate.name.as_deref().unwrap_or_default());
    let value = parse_numeric_value(candidate.value.as_ref());
    debug!(raw = ?candidate.value, parsed = value, finite = value.is_finite(), "Parsed value");

    if name.is_empty() || !value.is_finite() {
        return None;
    }

    let ref_low = parse_bound(candidate.ref_low.as_ref());
    let ref_high = parse_bound(candidate.ref_high.as_ref());
    let status = candidate
        .status
        .as_deref()
        .and_then(|s| AnalyteStatus::from_str(s.trim()).ok())
        .unwrap_or_else(|| infer_status(value, ref_low, ref_high));

    Some(NormalizedAnalyte {
        name,
        value,
        unit: candidate.unit.filter(|u| !u.trim().is_empty()),
        ref_low,
        ref_high,
        status,
        note: candidate.note.filter(|n| !n.trim().is_empty()),
    })
}

fn name_key(name: &str) -> String {
    normalize_name(name.trim()).to_lowercase()
}

/// Append requested entries absent from `analytes`. Returns how many were added.
fn backfill_missing(analytes: &mut Vec<NormalizedAnalyte>, requested: &[LabEntry]) -> usize {
    let mut present: HashSet<String> = analytes.iter().map(|a| name_key(&a.name)).collect();
    let mut added = 0;

    for entry in requested {
        if entry.analyte.trim().is_empty() || !entry.value.is_finite() {
            continue;
        }
        if !present.insert(name_key(&entry.analyte)) {
            continue;
        }
        let ref_low = entry.ref_low.filter(|v| v.is_finite());
        let ref_high = entry.ref_high.filter(|v| v.is_finite());
        analytes.push(NormalizedAnalyte {
            name: entry.analyte.clone(),
            value: entry.value,
            unit: Some(entry.unit.clone()).filter(|u| !u.trim().is_empty()),
            ref_low,
            ref_high,
            status: infer_status(entry.value, ref_low, ref_high),
            note: Some(BACKFILL_NOTE.to_string()),
        });
        added += 1;
    }
    added
}
