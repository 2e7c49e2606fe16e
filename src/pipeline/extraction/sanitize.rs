/// Characters that carry no text but confuse tokenization.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' // zero-width space
            | '\u{200C}' // zero-width non-joiner
            | '\u{200D}' // zero-width joiner
            | '\u{2060}' // word joiner
            | '\u{FEFF}' // BOM
            | '\u{00AD}' // soft hyphen
    )
}

/// Clean extracted document text before it reaches the model.
///
/// Drops control characters (newline and tab survive), invisible characters
/// and BOMs; maps non-breaking spaces to spaces; trims each line; collapses
/// runs of blank lines to one. Medical symbols (µ, °, arrows, `<`, `>`) are
/// left alone.
pub fn sanitize_document_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter_map(|c| match c {
            '\u{00A0}' | '\u{202F}' => Some(' '),
            '\r' => None,
            '\n' | '\t' => Some(c),
            c if c.is_control() || is_invisible(c) => None,
            c => Some(c),
        })
        .collect();

    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = true;
    for line in filtered.lines().map(str::trim) {
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push(line);
        previous_blank = blank;
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_null_and_control_characters() {
        let clean = sanitize_document_text("Glucose\x00 105\x01\x02 mg/dL");
        assert_eq!(clean, "Glucose 105 mg/dL");
    }

    #[test]
    fn collapses_blank_line_runs() {
        let clean = sanitize_document_text("\n\nLDL 145\n\n\n\nHDL 42\n\n");
        assert_eq!(clean, "LDL 145\n\nHDL 42");
    }

    #[test]
    fn trims_each_line_and_drops_carriage_returns() {
        let clean = sanitize_document_text("  LDL 145  \r\n\tHDL 42 ");
        assert_eq!(clean, "LDL 145\nHDL 42");
    }

    #[test]
    fn preserves_medical_symbols() {
        let raw = "Creatinina 80 µmol/L ↑ (<100) 37.5°C >5";
        assert_eq!(sanitize_document_text(raw), raw);
    }

    #[test]
    fn removes_invisible_characters_and_maps_nbsp() {
        let clean = sanitize_document_text("\u{FEFF}Hb\u{200B}\u{00A0}14,2");
        assert_eq!(clean, "Hb 14,2");
    }

    #[test]
    fn empty_and_control_only_inputs() {
        assert_eq!(sanitize_document_text(""), "");
        assert_eq!(sanitize_document_text("\x00\x01\n\n"), "");
    }
}
