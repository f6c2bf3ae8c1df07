/// Unary and binary numeric operators.
///
/// Type promotion follows the engine contract: if either operand is a
/// double the computation happens in f64, otherwise in i64. Checked i64
/// operations fall back to f64 on overflow instead of wrapping. Numeric
/// literals coerce to i64 when their text is an exact integer, to f64
/// otherwise.
use crate::error::Error;
use crate::value::Value;

use super::super::{ArithOp, Node};
use super::{ExecResult, ExecStatus, Executor, ValueList};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Double(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Double(f) => f,
        }
    }
}

pub(crate) fn value_number(value: &Value) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Double(f) => Some(Num::Double(*f)),
        Value::Numeric(text) => match text.parse::<i64>() {
            Ok(i) => Some(Num::Int(i)),
            Err(_) => text.parse::<f64>().ok().map(Num::Double),
        },
        _ => None,
    }
}

pub(crate) fn number_value(num: Num) -> Value {
    match num {
        Num::Int(i) => Value::Int(i),
        Num::Double(f) => Value::Double(f),
    }
}

/// Collapses an f64 with no fractional part back to an integer value.
pub(crate) fn collapse(f: f64) -> Num {
    // Strict < for the upper bound: 2^63 as f64 does not fit in i64.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Num::Int(f as i64)
    } else {
        Num::Double(f)
    }
}

/// `+expr` / `-expr`. The operand sequence auto-unwraps in lax mode and
/// the operator maps over it element-wise.
pub(crate) fn execute_unary(
    exec: &mut Executor,
    node: &Node,
    operand: &Node,
    negate: bool,
    value: &Value,
    mut found: Option<&mut ValueList>,
) -> ExecResult {
    let op_name = if negate { "-" } else { "+" };
    let mut seq = ValueList::default();
    let res = exec.execute_unwrap_result(operand, value, true, &mut seq)?;
    if res == ExecStatus::Failed {
        return Ok(res);
    }

    let next = node.next.as_deref();
    let has_next = next.is_some();
    let mut ret = ExecStatus::NotFound;
    for item in seq.into_vec() {
        let num = match value_number(&item) {
            Some(num) => num,
            None => {
                if found.is_none() && !has_next {
                    // Existence probe: a non-numeric item just means this
                    // branch produces nothing.
                    continue;
                }
                return exec.throw(Error::UnaryOperandNotNumeric(op_name));
            }
        };
        if found.is_none() && !has_next {
            return Ok(ExecStatus::Ok);
        }
        let out = if negate {
            match num {
                Num::Int(i) => i.checked_neg().map(Num::Int).unwrap_or(Num::Double(-(i as f64))),
                Num::Double(f) => Num::Double(-f),
            }
        } else {
            num
        };
        let out = number_value(out);
        let res = exec.execute_next(next, &out, found.as_deref_mut())?;
        if res == ExecStatus::Failed {
            return Ok(res);
        }
        if res == ExecStatus::Ok {
            ret = ExecStatus::Ok;
        }
    }
    Ok(ret)
}

/// `l op r` for `+ - * / %`. Each side must produce exactly one numeric
/// item; operand evaluation runs with throwing off so any failure folds
/// into the "not a single numeric value" report.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute_binary(
    exec: &mut Executor,
    node: &Node,
    op: ArithOp,
    left: &Node,
    right: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
) -> ExecResult {
    let lval = match operand_number(exec, left, value, "left", op)? {
        Ok(num) => num,
        Err(status) => return Ok(status),
    };
    let rval = match operand_number(exec, right, value, "right", op)? {
        Ok(num) => num,
        Err(status) => return Ok(status),
    };

    let out = match apply(op, lval, rval) {
        Ok(num) => num,
        Err(err) => return exec.throw(err),
    };

    let next = node.next.as_deref();
    if next.is_none() && found.is_none() {
        return Ok(ExecStatus::Ok);
    }
    let out = number_value(out);
    exec.execute_next(next, &out, found)
}

/// Evaluates one arithmetic operand to a single number, or reports why it
/// is not one. The inner `Err(status)` carries a suppressed FAILED.
fn operand_number(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    side: &'static str,
    op: ArithOp,
) -> Result<Result<Num, ExecStatus>, Error> {
    let mut seq = ValueList::default();
    let res = exec.execute_unwrap_result_no_throw(node, value, true, &mut seq)?;
    let single = match seq.head() {
        Some(v) if res != ExecStatus::Failed && seq.len() == 1 => v,
        _ => {
            return exec
                .throw(Error::BinaryOperandNotNumeric { side, op: op.name() })
                .map(Err);
        }
    };
    match value_number(single) {
        Some(num) => Ok(Ok(num)),
        None => exec
            .throw(Error::BinaryOperandNotNumeric { side, op: op.name() })
            .map(Err),
    }
}

fn apply(op: ArithOp, l: Num, r: Num) -> Result<Num, Error> {
    if let (Num::Int(a), Num::Int(b)) = (l, r) {
        return match op {
            ArithOp::Add => Ok(a.checked_add(b).map(Num::Int).unwrap_or(Num::Double(a as f64 + b as f64))),
            ArithOp::Sub => Ok(a.checked_sub(b).map(Num::Int).unwrap_or(Num::Double(a as f64 - b as f64))),
            ArithOp::Mul => Ok(a.checked_mul(b).map(Num::Int).unwrap_or(Num::Double(a as f64 * b as f64))),
            ArithOp::Div => {
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(a.checked_div(b).map(Num::Int).unwrap_or(Num::Double(a as f64 / b as f64)))
            }
            ArithOp::Mod => {
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Num::Int(a.checked_rem(b).unwrap_or(0)))
            }
        };
    }
    let a = l.as_f64();
    let b = r.as_f64();
    match op {
        ArithOp::Add => Ok(Num::Double(a + b)),
        ArithOp::Sub => Ok(Num::Double(a - b)),
        ArithOp::Mul => Ok(Num::Double(a * b)),
        ArithOp::Div => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Num::Double(a / b))
        }
        ArithOp::Mod => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Num::Double(a % b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::exec::QueryOptions;
    use crate::path::parse;
    use serde_json::json;

    fn query(path: &str, input: serde_json::Value) -> Result<Vec<Value>, Error> {
        parse(path)
            .unwrap()
            .query(&Value::from(input), &QueryOptions::new())
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(query("$.a + 2", json!({"a": 3})).unwrap(), vec![Value::Int(5)]);
        assert_eq!(query("$.a % 4", json!({"a": 10})).unwrap(), vec![Value::Int(2)]);
        assert_eq!(query("7 / 2", json!(null)).unwrap(), vec![Value::Int(3)]);
    }

    #[test]
    fn double_promotes() {
        assert_eq!(
            query("$.a + 0.5", json!({"a": 1})).unwrap(),
            vec![Value::Double(1.5)]
        );
    }

    #[test]
    fn division_by_zero_errors() {
        assert_eq!(
            query("$.a / 0", json!({"a": 1})).unwrap_err(),
            Error::DivisionByZero
        );
        assert_eq!(
            query("$.a % 0", json!({"a": 1})).unwrap_err(),
            Error::DivisionByZero
        );
    }

    #[test]
    fn non_single_operand_errors_with_side() {
        assert_eq!(
            query("$[*] + 1", json!([1, 2])).unwrap_err(),
            Error::BinaryOperandNotNumeric { side: "left", op: "+" }
        );
        assert_eq!(
            query("1 - $.a", json!({"a": "x"})).unwrap_err(),
            Error::BinaryOperandNotNumeric { side: "right", op: "-" }
        );
    }

    #[test]
    fn unary_minus_maps_over_arrays_in_lax_mode() {
        assert_eq!(
            query("-$[*]", json!([1, 2.5])).unwrap(),
            vec![Value::Int(-1), Value::Double(-2.5)]
        );
    }

    #[test]
    fn unary_on_non_numeric_errors() {
        assert_eq!(
            query("-$.a", json!({"a": "x"})).unwrap_err(),
            Error::UnaryOperandNotNumeric("-")
        );
    }

    #[test]
    fn int_overflow_falls_back_to_double() {
        let out = query("$.a + 1", json!({"a": i64::MAX})).unwrap();
        assert_eq!(out, vec![Value::Double(i64::MAX as f64 + 1.0)]);
    }

    #[test]
    fn numeric_literals_coerce() {
        assert_eq!(value_number(&Value::Numeric("12".into())), Some(Num::Int(12)));
        assert_eq!(
            value_number(&Value::Numeric("2.5".into())),
            Some(Num::Double(2.5))
        );
        assert_eq!(value_number(&Value::String("1".into())), None);
    }

    #[test]
    fn collapse_boundaries() {
        assert_eq!(collapse(2.0), Num::Int(2));
        assert_eq!(collapse(2.5), Num::Double(2.5));
        assert!(matches!(collapse(9223372036854775808.0), Num::Double(_)));
    }
}
