//! Lenient JSON value coercion
//!
//! Survey clients send loosely typed JSON (numbers as strings, nulls for
//! zero). These helpers turn a `serde_json::Value` into the numeric or
//! textual form a handler needs, mirroring the browser's `Number(...)` rules.

use serde_json::Value;

/// Numeric value of a JSON field
///
/// Numbers pass through, numeric strings are parsed (blank is 0), booleans
/// are 0/1 and `null` is 0. Arrays, objects and unparsable strings give `None`.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Finite numeric value of an optional field (absent is `None`)
pub fn finite_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(number).filter(|n| n.is_finite())
}

/// Round half toward positive infinity, as the browser's `Math.round` does
pub fn round_half_up(n: f64) -> i64 {
    (n + 0.5).floor() as i64
}

/// Round then clamp into `min..=max`
pub fn round_clamped(n: f64, min: i64, max: i64) -> i64 {
    round_half_up(n).clamp(min, max)
}

/// Whether a value looks like a UUID: 36 characters of hex digits or `-`
pub fn looks_like_uuid(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-'))
        .unwrap_or(false)
}

/// Trimmed, non-empty string truncated to `max_chars`; anything else is `None`
pub fn sanitize_text(value: Option<&Value>, max_chars: usize) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    Some(s.chars().take(max_chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_coercion() {
        assert_eq!(number(&json!(42)), Some(42.0));
        assert_eq!(number(&json!("1500")), Some(1500.0));
        assert_eq!(number(&json!(" 7 ")), Some(7.0));
        assert_eq!(number(&json!("")), Some(0.0));
        assert_eq!(number(&json!(null)), Some(0.0));
        assert_eq!(number(&json!(true)), Some(1.0));
        assert_eq!(number(&json!("fast")), None);
        assert_eq!(number(&json!([1])), None);
        assert_eq!(number(&json!({"ms": 1})), None);
    }

    #[test]
    fn test_finite_number_rejects_missing_and_infinite() {
        assert_eq!(finite_number(None), None);
        assert_eq!(finite_number(Some(&json!("inf"))), None);
        assert_eq!(finite_number(Some(&json!(12.5))), Some(12.5));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.51), -3);
    }

    #[test]
    fn test_round_clamped() {
        assert_eq!(round_clamped(-40.0, 0, 600_000), 0);
        assert_eq!(round_clamped(1_000_000.0, 0, 600_000), 600_000);
        assert_eq!(round_clamped(4.6, 0, 5), 5);
        assert_eq!(round_clamped(1234.4, 0, 600_000), 1234);
    }

    #[test]
    fn test_looks_like_uuid() {
        assert!(looks_like_uuid(&json!("3f2b8c4e-9a1d-4c55-8e7f-0123456789ab")));
        assert!(looks_like_uuid(&json!("3F2B8C4E-9A1D-4C55-8E7F-0123456789AB")));
        assert!(!looks_like_uuid(&json!("3f2b8c4e")));
        assert!(!looks_like_uuid(&json!("zz2b8c4e-9a1d-4c55-8e7f-0123456789ab")));
        assert!(!looks_like_uuid(&json!(12345)));
        assert!(!looks_like_uuid(&json!(null)));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text(Some(&json!("  25-34 ")), 200), Some("25-34".to_string()));
        assert_eq!(sanitize_text(Some(&json!("   ")), 200), None);
        assert_eq!(sanitize_text(Some(&json!(3)), 200), None);
        assert_eq!(sanitize_text(None, 200), None);

        let long = "é".repeat(250);
        let cut = sanitize_text(Some(&json!(long)), 200).unwrap();
        assert_eq!(cut.chars().count(), 200);
    }
}
