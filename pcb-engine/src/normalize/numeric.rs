//! Lenient numeric extraction for survey cells

use serde_json::Value;

/// Placeholder strings that survey vendors use for suppressed or missing cells
const EMPTY_MARKERS: [&str; 4] = ["***", "", "null", "undefined"];

/// Convert a raw cell to a number, never failing
///
/// Native numbers pass through. Strings have `,` and `$` stripped; suppression
/// markers and anything unparsable become `0.0`. Every other JSON type is
/// `0.0`.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_numeric_text(s),
        _ => 0.0,
    }
}

fn parse_numeric_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if EMPTY_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return 0.0;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
