//! Canonical byte encoding used as hash input.
//!
//! Output matches Python's `json.dumps(value, sort_keys=True)` exactly:
//! keys sorted at every level, `", "` and `": "` separators, ASCII-only
//! strings, and `repr()`-style floats. Chains written by the legacy Python
//! service hash identically here.

use crate::error::ChainError;
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt::Write;

pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, ChainError> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), ChainError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(key, out);
                out.push_str(": ");
                write_value(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_number(n: &Number, out: &mut String) -> Result<(), ChainError> {
    if n.is_u64() || n.is_i64() {
        out.push_str(&n.to_string());
        return Ok(());
    }
    let f = n
        .as_f64()
        .ok_or_else(|| ChainError::Serialization(format!("unrepresentable number {}", n)))?;
    out.push_str(&format_float(f)?);
    Ok(())
}

/// Shortest round-trip decimal, written the way Python's `float.__repr__` does.
pub fn format_float(f: f64) -> Result<String, ChainError> {
    if !f.is_finite() {
        return Err(ChainError::Serialization(format!("non-finite float {}", f)));
    }
    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // Rust renders "1.5e-5"; Python wants "1.5e-05"
        let sci = format!("{:e}", f);
        let (mantissa, exponent) = sci
            .split_once('e')
            .ok_or_else(|| ChainError::Serialization(format!("unexpected float form {}", sci)))?;
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exponent),
        };
        return Ok(format!("{}e{}{:0>2}", mantissa, sign, digits));
    }
    let mut plain = format!("{}", f);
    if !plain.contains('.') {
        plain.push_str(".0");
    }
    Ok(plain)
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // writing to a String cannot fail
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_with_python_separators() {
        let v = json!({"proof": 100, "index": 1, "transactions": [], "previous_hash": "1", "timestamp": 1700000000.5});
        assert_eq!(
            to_canonical_string(&v).unwrap(),
            r#"{"index": 1, "previous_hash": "1", "proof": 100, "timestamp": 1700000000.5, "transactions": []}"#
        );
    }

    #[test]
    fn test_nested_keys_sorted() {
        let v = json!([{"transactionID": "t1", "sender": "alice", "report": "x-ray"}]);
        assert_eq!(
            to_canonical_string(&v).unwrap(),
            r#"[{"report": "x-ray", "sender": "alice", "transactionID": "t1"}]"#
        );
    }

    #[test]
    fn test_string_escapes_match_ensure_ascii() {
        let v = json!("line1\nline2\t\"q\" \\ \u{7f} 😀 zoë \u{01}");
        assert_eq!(
            to_canonical_string(&v).unwrap(),
            r#""line1\nline2\t\"q\" \\ \u007f \ud83d\ude00 zo\u00eb \u0001""#
        );
    }

    #[test]
    fn test_float_repr() {
        let cases = [
            (1700000000.0, "1700000000.0"),
            (0.0001, "0.0001"),
            (0.00001, "1e-05"),
            (1e16, "1e+16"),
            (1234567890123456.0, "1234567890123456.0"),
            (1.5e-5, "1.5e-05"),
            (-0.0, "-0.0"),
            (0.1, "0.1"),
            (1e22, "1e+22"),
            (123.456, "123.456"),
        ];
        for (f, expected) in cases {
            assert_eq!(format_float(f).unwrap(), expected, "formatting {:?}", f);
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(format_float(f64::NAN).is_err());
        assert!(format_float(f64::INFINITY).is_err());
    }
}
