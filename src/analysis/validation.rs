//! Boundary checks for `POST /api/analyze` bodies.
//!
//! Every violation is collected so the caller can show them all at once.

use crate::models::{Demographics, LabEntry, UploadRequest};

pub const MIN_BIRTH_YEAR: i32 = 1900;
pub const HEIGHT_CM_RANGE: (f64, f64) = (50.0, 300.0);
pub const WEIGHT_KG_RANGE: (f64, f64) = (20.0, 500.0);

/// Validate an analysis request. `current_year` bounds the birth year.
pub fn validate_upload_request(
    request: &UploadRequest,
    current_year: i32,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check_demographics(&request.demographics, current_year, &mut errors);

    if request.lab_results.is_empty() {
        errors.push("lab_results must contain at least one entry".to_string());
    }
    for (i, entry) in request.lab_results.iter().enumerate() {
        check_entry(i, entry, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_demographics(d: &Demographics, current_year: i32, errors: &mut Vec<String>) {
    if d.birth_year < MIN_BIRTH_YEAR || d.birth_year > current_year {
        errors.push(format!(
            "demographics.birth_year must be between {MIN_BIRTH_YEAR} and {current_year}"
        ));
    }
    check_range("demographics.height_cm", d.height_cm, HEIGHT_CM_RANGE, errors);
    check_range("demographics.weight_kg", d.weight_kg, WEIGHT_KG_RANGE, errors);
}

fn check_range(field: &str, value: f64, (min, max): (f64, f64), errors: &mut Vec<String>) {
    // NaN fails both comparisons, so test containment rather than exclusion.
    if !(value >= min && value <= max) {
        errors.push(format!("{field} must be between {min} and {max}"));
    }
}

fn check_entry(i: usize, entry: &LabEntry, errors: &mut Vec<String>) {
    if entry.analyte.trim().is_empty() {
        errors.push(format!("lab_results[{i}].analyte is required"));
    }
    if entry.unit.trim().is_empty() {
        errors.push(format!("lab_results[{i}].unit is required"));
    }
    if !entry.value.is_finite() {
        errors.push(format!("lab_results[{i}].value must be a number"));
    }
    for (name, bound) in [("ref_low", entry.ref_low), ("ref_high", entry.ref_high)] {
        if bound.is_some_and(|b| !b.is_finite()) {
            errors.push(format!("lab_results[{i}].{name} must be a number"));
        }
    }
}
