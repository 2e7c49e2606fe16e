//! Locale-tolerant numeric parsing for lab values.
//!
//! Model output carries values the way they were printed on the report:
//! European decimal commas, thousands separators, trailing units, trend
//! arrows. Everything funnels through [`parse_numeric_value`], which never
//! fails: unparseable input yields `f64::NAN`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::RawValue;

static TREND_ARROWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[↑↓→←⬆⬇]").expect("valid arrow regex"));

static TRAILING_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(mg/dL|g/dL|mmol/L|µmol/L|μmol/L|U/L|%|g/L|mg/L)\s*$")
        .expect("valid unit regex")
});

static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+,\d{1,2}$").expect("valid decimal comma regex"));

static THOUSANDS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(,\d{3})*$").expect("valid thousands regex"));

static THOUSANDS_WITH_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(,\d{3})*\.\d+$").expect("valid thousands+decimal regex")
});

/// Longest leading float literal, matching what a lenient float reader accepts.
static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid float regex")
});

/// Parse a loosely formatted value. Numbers pass through unchanged,
/// missing input and garbage become `NaN`.
pub fn parse_numeric_value(input: Option<&RawValue>) -> f64 {
    match input {
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Text(s)) => parse_numeric_str(s),
        None => f64::NAN,
    }
}

/// String form of [`parse_numeric_value`].
pub fn parse_numeric_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let without_arrows = TREND_ARROWS.replace_all(trimmed, "");
    let without_unit = TRAILING_UNIT.replace(&without_arrows, "");
    let s = without_unit.trim();

    let cleaned = if DECIMAL_COMMA.is_match(s) {
        s.replacen(',', ".", 1)
    } else if THOUSANDS_ONLY.is_match(s) {
        s.replace(',', "")
    } else if THOUSANDS_WITH_DECIMAL.is_match(s) {
        match s.split_once('.') {
            Some((int_part, frac)) => format!("{}.{}", int_part.replace(',', ""), frac),
            None => s.replace(',', ""),
        }
    } else {
        s.replace(',', "")
    };

    LEADING_FLOAT
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Parse an optional reference bound: absent stays absent, and a bound that
/// does not parse to a finite number is dropped rather than kept as `NaN`.
pub fn parse_bound(input: Option<&RawValue>) -> Option<f64> {
    input
        .map(|v| parse_numeric_value(Some(v)))
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> Option<RawValue> {
        Some(RawValue::Text(s.to_string()))
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(parse_numeric_value(text("17,9").as_ref()), 17.9);
        assert_eq!(parse_numeric_value(text("0,25").as_ref()), 0.25);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(parse_numeric_value(text("1,234").as_ref()), 1234.0);
        assert_eq!(parse_numeric_value(text("12,345,678").as_ref()), 12_345_678.0);
    }

    #[test]
    fn thousands_with_decimal_point() {
        assert_eq!(parse_numeric_value(text("1,234.5").as_ref()), 1234.5);
        assert_eq!(parse_numeric_value(text("1,234.56").as_ref()), 1234.56);
    }

    #[test]
    fn trailing_unit_stripped() {
        assert_eq!(parse_numeric_value(text("120 mg/dL").as_ref()), 120.0);
        assert_eq!(parse_numeric_value(text("6.2%").as_ref()), 6.2);
        assert_eq!(parse_numeric_value(text("14,2 G/DL").as_ref()), 14.2);
        assert_eq!(parse_numeric_value(text("5.1 mmol/L").as_ref()), 5.1);
    }

    #[test]
    fn arrows_stripped() {
        assert_eq!(parse_numeric_value(text("↑95").as_ref()), 95.0);
        assert_eq!(parse_numeric_value(text("↑95 mg/dL").as_ref()), 95.0);
        assert_eq!(parse_numeric_value(text("3,4 ↓").as_ref()), 3.4);
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(parse_numeric_value(Some(&RawValue::Number(42.5))), 42.5);
        assert_eq!(parse_numeric_value(Some(&RawValue::Number(-3.0))), -3.0);
    }

    #[test]
    fn invalid_input_yields_nan() {
        assert!(parse_numeric_value(None).is_nan());
        assert!(parse_numeric_value(text("").as_ref()).is_nan());
        assert!(parse_numeric_value(text("   ").as_ref()).is_nan());
        assert!(parse_numeric_value(text("abc").as_ref()).is_nan());
        assert!(parse_numeric_value(text("negative").as_ref()).is_nan());
    }

    #[test]
    fn leading_number_with_trailing_text() {
        // Unrecognized units are not stripped, but the leading number still reads.
        assert_eq!(parse_numeric_value(text("4.5 x10^9/L").as_ref()), 4.5);
    }

    #[test]
    fn bound_parsing() {
        assert_eq!(parse_bound(None), None);
        assert_eq!(parse_bound(text("n/a").as_ref()), None);
        assert_eq!(parse_bound(text("100").as_ref()), Some(100.0));
        assert_eq!(parse_bound(Some(&RawValue::Number(13.5))), Some(13.5));
    }

    proptest! {
        #[test]
        fn reparsing_display_is_identity(x in -1.0e9f64..1.0e9f64) {
            let first = parse_numeric_str(&x.to_string());
            prop_assert_eq!(first, x);
            prop_assert_eq!(parse_numeric_str(&first.to_string()), first);
        }

        #[test]
        fn idempotent_on_formatted_strings(
            int_part in 0u32..1_000_000,
            frac in proptest::option::of(0u32..100),
            comma in any::<bool>(),
        ) {
            let s = match (frac, comma) {
                (Some(f), true) => format!("{int_part},{f}"),
                (Some(f), false) => format!("{int_part}.{f}"),
                (None, _) => int_part.to_string(),
            };
            let first = parse_numeric_str(&s);
            prop_assert!(first.is_finite());
            prop_assert_eq!(parse_numeric_str(&first.to_string()), first);
        }

        #[test]
        fn never_panics(s in "\\PC*") {
            let _ = parse_numeric_str(&s);
        }
    }
}
