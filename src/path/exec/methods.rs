/// Item methods: `.type()`, `.size()`, numeric coercions, `.string()`,
/// `.boolean()`, `.keyvalue()`, and the datetime constructors.
///
/// Scalar-typed methods auto-unwrap an array target in lax mode and
/// report a type mismatch otherwise. Coercion failures carry the
/// offending text in the contractual `argument "…" is invalid for
/// type …` form.
use crate::datetime::{CastError, Datetime, DatetimeKind};
use crate::error::Error;
use crate::output::format_double;
use crate::value::Value;

use super::super::{Method, Node, NodeKind};
use super::arith::{Num, collapse, number_value, value_number};
use super::{ExecResult, ExecStatus, Executor, ValueList};

pub(crate) fn execute_method(
    exec: &mut Executor,
    node: &Node,
    method: &Method,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    match method {
        Method::Type => {
            let v = Value::String(value.type_name().to_string());
            exec.execute_next(node.next.as_deref(), &v, found)
        }
        Method::Size => execute_size(exec, node, value, found),
        Method::Abs => execute_numeric(exec, node, value, found, unwrap, "abs", num_abs),
        Method::Floor => execute_numeric(exec, node, value, found, unwrap, "floor", num_floor),
        Method::Ceiling => {
            execute_numeric(exec, node, value, found, unwrap, "ceiling", num_ceiling)
        }
        Method::Double => execute_double(exec, node, value, found, unwrap),
        Method::Bigint => execute_integer_like(exec, node, value, found, unwrap, "bigint"),
        Method::Integer => execute_integer_like(exec, node, value, found, unwrap, "integer"),
        Method::Number => execute_number(exec, node, value, found, unwrap),
        Method::Decimal { precision, scale } => execute_decimal(
            exec,
            node,
            value,
            found,
            unwrap,
            precision.as_deref(),
            scale.as_deref(),
        ),
        Method::String => execute_string(exec, node, value, found, unwrap),
        Method::Boolean => execute_boolean(exec, node, value, found, unwrap),
        Method::KeyValue => execute_keyvalue(exec, node, value, found, unwrap),
        Method::Date
        | Method::Time(_)
        | Method::TimeTz(_)
        | Method::Timestamp(_)
        | Method::TimestampTz(_)
        | Method::Datetime(_) => execute_datetime(exec, node, method, value, found, unwrap),
    }
}

fn execute_size(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
) -> ExecResult {
    let size = match value {
        Value::Array(elements) => elements.len() as i64,
        _ if exec.auto_wrap() => 1,
        _ => {
            return exec.structural(Error::MethodTargetMismatch {
                method: "size",
                expected: "an array",
            });
        }
    };
    exec.execute_next(node.next.as_deref(), &Value::Int(size), found)
}

fn num_abs(num: Num) -> Num {
    match num {
        Num::Int(i) => i
            .checked_abs()
            .map(Num::Int)
            .unwrap_or(Num::Double((i as f64).abs())),
        Num::Double(f) => collapse(f.abs()),
    }
}

fn num_floor(num: Num) -> Num {
    match num {
        Num::Int(_) => num,
        Num::Double(f) => collapse(f.floor()),
    }
}

fn num_ceiling(num: Num) -> Num {
    match num {
        Num::Int(_) => num,
        Num::Double(f) => collapse(f.ceil()),
    }
}

fn execute_numeric(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
    method: &'static str,
    op: fn(Num) -> Num,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let Some(num) = value_number(value) else {
        return exec.throw(Error::MethodTargetMismatch {
            method,
            expected: "a numeric value",
        });
    };
    let out = number_value(op(num));
    exec.execute_next(node.next.as_deref(), &out, found)
}

fn execute_double(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let f = match value {
        Value::Int(i) => *i as f64,
        Value::Double(f) => *f,
        Value::Numeric(text) => match text.trim().parse::<f64>() {
            Ok(f) => f,
            Err(_) => {
                return exec.throw(Error::InvalidMethodArgument {
                    arg: text.clone(),
                    method: "double",
                    ty: "double precision",
                });
            }
        },
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) => f,
            Err(_) => {
                return exec.throw(Error::InvalidMethodArgument {
                    arg: s.clone(),
                    method: "double",
                    ty: "double precision",
                });
            }
        },
        _ => {
            return exec.throw(Error::MethodTargetMismatch {
                method: "double",
                expected: "a string or numeric value",
            });
        }
    };
    if !f.is_finite() {
        return exec.throw(Error::NanOrInfinity("double"));
    }
    exec.execute_next(node.next.as_deref(), &Value::Double(f), found)
}

/// `.bigint()` (64-bit) and `.integer()` (32-bit). Fractional numerics
/// round half away from zero; string inputs must be integral text.
fn execute_integer_like(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
    method: &'static str,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let invalid = |exec: &Executor| {
        exec.throw(Error::InvalidMethodArgument {
            arg: value_text(value),
            method,
            ty: method,
        })
    };
    let out = match value {
        Value::Int(i) => *i,
        Value::Double(f) => match f64_to_i64(*f) {
            Some(i) => i,
            None => return invalid(exec),
        },
        Value::Numeric(text) => match text.parse::<i64>() {
            Ok(i) => i,
            Err(_) => match text.parse::<f64>().ok().and_then(f64_to_i64) {
                Some(i) => i,
                None => return invalid(exec),
            },
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => i,
            Err(_) => return invalid(exec),
        },
        _ => {
            return exec.throw(Error::MethodTargetMismatch {
                method,
                expected: "a string or numeric value",
            });
        }
    };
    if method == "integer" && i32::try_from(out).is_err() {
        return invalid(exec);
    }
    exec.execute_next(node.next.as_deref(), &Value::Int(out), found)
}

/// Rounds half away from zero to an i64, if the double is in range.
fn f64_to_i64(f: f64) -> Option<i64> {
    let rounded = f.round();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

fn execute_number(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let out = match coerce_number(exec, value, "number")? {
        Ok(v) => v,
        Err(status) => return Ok(status),
    };
    exec.execute_next(node.next.as_deref(), &out, found)
}

/// Shared `.number()`/`.decimal()` coercion. The inner `Err` carries a
/// suppressed FAILED status.
fn coerce_number(
    exec: &mut Executor,
    value: &Value,
    method: &'static str,
) -> Result<Result<Value, ExecStatus>, Error> {
    match value {
        Value::Int(_) | Value::Double(_) | Value::Numeric(_) => {
            match value_number(value) {
                Some(num) if num.as_f64().is_finite() => Ok(Ok(value.clone())),
                _ => exec.throw(Error::NanOrInfinity(method)).map(Err),
            }
        }
        Value::String(s) => {
            if let Ok(i) = s.trim().parse::<i64>() {
                return Ok(Ok(Value::Int(i)));
            }
            match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Ok(Value::Double(f))),
                Ok(_) => exec.throw(Error::NanOrInfinity(method)).map(Err),
                Err(_) => exec
                    .throw(Error::InvalidMethodArgument {
                        arg: s.clone(),
                        method,
                        ty: "numeric",
                    })
                    .map(Err),
            }
        }
        _ => exec
            .throw(Error::MethodTargetMismatch {
                method,
                expected: "a string or numeric value",
            })
            .map(Err),
    }
}

fn execute_decimal(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
    precision: Option<&Node>,
    scale: Option<&Node>,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let coerced = match coerce_number(exec, value, "decimal")? {
        Ok(v) => v,
        Err(status) => return Ok(status),
    };
    let Some(precision) = precision else {
        // Bare `.decimal()` behaves like `.number()`.
        return exec.execute_next(node.next.as_deref(), &coerced, found);
    };

    let p = match literal_int(precision)? {
        Some(p) if i32::try_from(p).is_ok() => p,
        _ => return exec.throw(Error::DecimalPrecisionInt),
    };
    if !(1..=1000).contains(&p) {
        return exec.throw(Error::DecimalPrecision(p));
    }
    let s = match scale {
        None => 0,
        Some(scale) => match literal_int(scale)? {
            Some(s) if i32::try_from(s).is_ok() => s,
            _ => return exec.throw(Error::DecimalScaleInt),
        },
    };
    if !(-1000..=1000).contains(&s) {
        return exec.throw(Error::DecimalScale(s));
    }

    let x = match value_number(&coerced) {
        Some(num) => num.as_f64(),
        None => return Err(Error::Internal("non-numeric value reached .decimal() rounding")),
    };
    let rounded = if s >= 0 {
        let factor = 10f64.powi(s as i32);
        (x * factor).round() / factor
    } else {
        let factor = 10f64.powi(-s as i32);
        (x / factor).round() * factor
    };
    // Digits allowed left of the decimal point: precision minus scale.
    let limit = 10f64.powi((p - s) as i32);
    if rounded.abs() >= limit {
        return exec.throw(Error::InvalidMethodArgument {
            arg: value_text(value),
            method: "decimal",
            ty: "numeric",
        });
    }
    let out = number_value(collapse(rounded));
    exec.execute_next(node.next.as_deref(), &out, found)
}

fn execute_string(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let rendered = match value {
        Value::String(s) => s.clone(),
        Value::Int(i) => {
            let mut buf = itoa::Buffer::new();
            buf.format(*i).to_string()
        }
        Value::Double(f) => format_double(*f),
        Value::Numeric(text) => text.clone(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Datetime(dt) => dt.to_string(),
        _ => {
            return exec.throw(Error::MethodTargetMismatch {
                method: "string",
                expected: "a bool, string, numeric, or datetime value",
            });
        }
    };
    let out = Value::String(rendered);
    exec.execute_next(node.next.as_deref(), &out, found)
}

fn execute_boolean(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let invalid = |exec: &Executor| {
        exec.throw(Error::InvalidMethodArgument {
            arg: value_text(value),
            method: "boolean",
            ty: "boolean",
        })
    };
    let out = match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Double(f) => {
            if f.fract() == 0.0 {
                *f != 0.0
            } else {
                return invalid(exec);
            }
        }
        Value::Numeric(_) => match value_number(value) {
            Some(Num::Int(i)) => i != 0,
            Some(Num::Double(f)) if f.fract() == 0.0 => f != 0.0,
            _ => return invalid(exec),
        },
        Value::String(s) => match parse_bool_string(s) {
            Some(b) => b,
            None => return invalid(exec),
        },
        _ => {
            return exec.throw(Error::MethodTargetMismatch {
                method: "boolean",
                expected: "a bool, string, or numeric value",
            });
        }
    };
    exec.execute_next(node.next.as_deref(), &Value::Bool(out), found)
}

/// The boolean string forms: t/f, true/false, y/n, yes/no, on/off, 1/0,
/// case-insensitive.
fn parse_bool_string(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// `.keyvalue()`: explodes an object into `{key, value, id}` envelopes in
/// sorted key order. All envelopes of one application share the target
/// container's id; each envelope becomes the base object for whatever the
/// chain applies to it, under a freshly generated id.
fn execute_keyvalue(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    mut found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let Value::Object(fields) = value else {
        return exec.throw(Error::MethodTargetMismatch {
            method: "keyvalue",
            expected: "an object",
        });
    };
    if fields.is_empty() {
        return Ok(ExecStatus::NotFound);
    }

    let id = exec.keyvalue_id(value);
    let mut entries: Vec<(&String, &Value)> = fields.iter().map(|(k, v)| (k, v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let next = node.next.as_deref();
    let mut ret = ExecStatus::NotFound;
    for (key, member) in entries {
        exec.check_cancelled()?;
        let envelope = Value::Object(vec![
            ("key".to_string(), Value::String(key.clone())),
            ("value".to_string(), member.clone()),
            ("id".to_string(), Value::Int(id)),
        ]);
        let base_id = exec.next_generated_object_id();
        let saved = exec.set_base_object(&envelope, base_id);
        let res = exec.execute_next(next, &envelope, found.as_deref_mut());
        exec.restore_base_object(saved);
        let res = res?;
        if res == ExecStatus::Failed {
            return Ok(res);
        }
        if res == ExecStatus::Ok {
            if found.is_none() {
                return Ok(res);
            }
            ret = ExecStatus::Ok;
        }
    }
    Ok(ret)
}

fn execute_datetime(
    exec: &mut Executor,
    node: &Node,
    method: &Method,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if let Method::Datetime(Some(_)) = method {
        return Err(Error::DatetimeTemplate);
    }
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let name = method.name();
    let Value::String(s) = value else {
        return exec.throw(Error::MethodTargetMismatch {
            method: name,
            expected: "a string",
        });
    };
    let Some(parsed) = Datetime::parse(s) else {
        return exec.throw(Error::DatetimeFormat {
            kind: "datetime",
            value: s.clone(),
        });
    };

    let (target, precision) = match method {
        Method::Date => (Some(DatetimeKind::Date), None),
        Method::Time(p) => (Some(DatetimeKind::Time), p.as_deref()),
        Method::TimeTz(p) => (Some(DatetimeKind::TimeTz), p.as_deref()),
        Method::Timestamp(p) => (Some(DatetimeKind::Timestamp), p.as_deref()),
        Method::TimestampTz(p) => (Some(DatetimeKind::TimestampTz), p.as_deref()),
        Method::Datetime(_) => (None, None),
        _ => return Err(Error::Internal("non-datetime method reached datetime execution")),
    };

    let mut dt = match target {
        Some(kind) => match parsed.convert_to(kind, exec.use_tz()) {
            Ok(dt) => dt,
            Err(CastError::NotRecognized) => {
                return exec.throw(Error::DatetimeFormat {
                    kind: kind.short_name(),
                    value: s.clone(),
                });
            }
            Err(CastError::NeedsTimeZone { from, to }) => {
                return exec.throw(Error::TimeZoneUsage { from, to });
            }
        },
        None => parsed,
    };

    if let Some(precision) = precision {
        let p = match literal_int(precision)? {
            Some(p) if i32::try_from(p).is_ok() => p as i32,
            _ => return exec.throw(Error::TimePrecision(name)),
        };
        dt = dt.truncate(p);
    }

    let out = Value::Datetime(dt);
    exec.execute_next(node.next.as_deref(), &out, found)
}

/// Extracts a numeric-literal method argument. `None` means the literal
/// does not fit an i64 (out of integer range for the caller).
fn literal_int(node: &Node) -> Result<Option<i64>, Error> {
    match &node.kind {
        NodeKind::Int(n) => Ok(Some(*n)),
        NodeKind::Numeric(text) => Ok(text.parse::<i64>().ok()),
        _ => Err(Error::Internal("expected numeric literal method argument")),
    }
}

/// The value as it should appear inside an `argument "…"` message.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Double(f) => format_double(*f),
        Value::Numeric(text) => text.clone(),
        Value::Bool(b) => b.to_string(),
        other => crate::output::to_json_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_string_forms() {
        assert_eq!(parse_bool_string("TRUE"), Some(true));
        assert_eq!(parse_bool_string(" yes "), Some(true));
        assert_eq!(parse_bool_string("off"), Some(false));
        assert_eq!(parse_bool_string("0"), Some(false));
        assert_eq!(parse_bool_string("tr"), None);
        assert_eq!(parse_bool_string("2"), None);
    }

    #[test]
    fn rounding_half_away_from_zero() {
        assert_eq!(f64_to_i64(1.5), Some(2));
        assert_eq!(f64_to_i64(-1.5), Some(-2));
        assert_eq!(f64_to_i64(2.4), Some(2));
        assert_eq!(f64_to_i64(1e300), None);
    }

    #[test]
    fn numeric_method_helpers_preserve_integerness() {
        assert_eq!(num_floor(Num::Double(2.5)), Num::Int(2));
        assert_eq!(num_ceiling(Num::Double(2.5)), Num::Int(3));
        assert_eq!(num_abs(Num::Int(-7)), Num::Int(7));
        assert_eq!(num_abs(Num::Double(-2.25)), Num::Double(2.25));
        assert_eq!(num_abs(Num::Int(i64::MIN)), Num::Double(-(i64::MIN as f64)));
    }
}
