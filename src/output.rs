/// Canonical JSON rendering.
///
/// Compact, single-line output. Uses `itoa` for integers and `ryu` for
/// doubles; a ryu `.0` suffix is collapsed so integral doubles render as
/// plain integers, matching the engine's `.string()` contract. `Numeric`
/// literals print their text verbatim, datetimes render as quoted
/// canonical strings.
use crate::value::Value;

pub fn to_json_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Shortest-round-trip rendering of a double, without a trailing `.0`.
pub fn format_double(f: f64) -> String {
    let mut buf = ryu::Buffer::new();
    let s = buf.format(f);
    match s.strip_suffix(".0") {
        Some(int_part) => int_part.to_string(),
        None => s.to_string(),
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(i) => {
            let mut buf = itoa::Buffer::new();
            out.push_str(buf.format(*i));
        }
        Value::Double(f) => out.push_str(&format_double(*f)),
        Value::Numeric(text) => out.push_str(text),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(fields) => {
            out.push('{');
            for (i, (key, val)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, val);
            }
            out.push('}');
        }
        Value::Datetime(dt) => write_string(out, &dt.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
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
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_scalars() {
        assert_eq!(to_json_string(&Value::Null), "null");
        assert_eq!(to_json_string(&Value::Bool(true)), "true");
        assert_eq!(to_json_string(&Value::Int(-42)), "-42");
        assert_eq!(to_json_string(&Value::Double(1.5)), "1.5");
        assert_eq!(to_json_string(&Value::Numeric("2.50".into())), "2.50");
    }

    #[test]
    fn integral_double_collapses() {
        assert_eq!(format_double(3.0), "3");
        assert_eq!(format_double(-1.0), "-1");
        assert_eq!(format_double(0.1), "0.1");
    }

    #[test]
    fn renders_containers() {
        let v = Value::from(json!({"a": [1, "x"], "b": null}));
        assert_eq!(to_json_string(&v), r#"{"a":[1,"x"],"b":null}"#);
    }

    #[test]
    fn escapes_strings() {
        let v = Value::String("a\"b\\c\nd\u{01}".into());
        assert_eq!(to_json_string(&v), "\"a\\\"b\\\\c\\nd\\u0001\"");
    }
}
