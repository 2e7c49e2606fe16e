use std::collections::HashMap;
use std::sync::LazyLock;

/// Known synonyms and abbreviations, keyed by lowercase label.
const ALIASES: &[(&str, &str)] = &[
    ("ldl-c", "LDL"),
    ("ldl cholesterol", "LDL"),
    ("colesterolo ldl", "LDL"),
    ("hdl-c", "HDL"),
    ("hdl cholesterol", "HDL"),
    ("colesterolo hdl", "HDL"),
    ("glycated hemoglobin", "HbA1c"),
    ("hba1c", "HbA1c"),
    ("emoglobina glicata", "HbA1c"),
    ("glucose (fasting)", "Glucose"),
    ("fasting glucose", "Glucose"),
    ("glicemia", "Glucose"),
    ("hb", "Hemoglobin"),
    ("emoglobina", "Hemoglobin"),
    ("trigliceridi", "Triglycerides"),
    ("colesterolo totale", "Total Cholesterol"),
];

static ALIAS_TABLE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| ALIASES.iter().copied().collect());

/// Map a raw analyte label to its canonical name.
///
/// Lookup is case-insensitive on the label exactly as given; unknown labels
/// are returned verbatim (no trimming, no case change).
pub fn normalize_name(raw: &str) -> String {
    match ALIAS_TABLE.get(raw.to_lowercase().as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => raw.to_string(),
    }
}
