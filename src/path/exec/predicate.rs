/// Predicate evaluation: filters, boolean connectives, `exists`,
/// `starts with`, and `like_regex`, all in Kleene three-valued logic.
use crate::error::Error;
use crate::value::Value;

use super::super::{Node, NodeKind, RegexPattern};
use super::compare::{Ternary, compare_values};
use super::{ExecResult, ExecStatus, Executor, ValueList};

/// Evaluates a boolean-valued node. Only non-suppressible failures
/// surface as `Err`; every suppressible condition becomes UNKNOWN.
pub(crate) fn execute_bool(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    can_have_next: bool,
) -> Result<Ternary, Error> {
    if !can_have_next && node.next.is_some() {
        return Err(Error::Internal("boolean jsonpath item cannot have next item"));
    }
    match &node.kind {
        NodeKind::And(left, right) => {
            let lhs = execute_bool(exec, left, value, false)?;
            if lhs == Ternary::False {
                return Ok(Ternary::False);
            }
            // UNKNOWN && FALSE is FALSE, so the right side always runs.
            let rhs = execute_bool(exec, right, value, false)?;
            Ok(if rhs == Ternary::True { lhs } else { rhs })
        }
        NodeKind::Or(left, right) => {
            let lhs = execute_bool(exec, left, value, false)?;
            if lhs == Ternary::True {
                return Ok(Ternary::True);
            }
            let rhs = execute_bool(exec, right, value, false)?;
            Ok(if rhs == Ternary::False { lhs } else { rhs })
        }
        NodeKind::Not(arg) => Ok(execute_bool(exec, arg, value, false)?.not()),
        NodeKind::IsUnknown(arg) => {
            let outcome = execute_bool(exec, arg, value, false)?;
            Ok(Ternary::from_bool(outcome == Ternary::Unknown))
        }
        NodeKind::Compare(op, left, right) => {
            let op = *op;
            execute_predicate(exec, left, Some(right), value, true, |exec, l, r| {
                Ok(compare_values(op, l, r.unwrap_or(&Value::Null), exec.use_tz()))
            })
        }
        NodeKind::StartsWith(left, right) => {
            execute_predicate(exec, left, Some(right), value, false, |_, whole, prefix| {
                Ok(starts_with(whole, prefix.unwrap_or(&Value::Null)))
            })
        }
        NodeKind::LikeRegex(operand, pattern) => {
            execute_predicate(exec, operand, None, value, false, |_, item, _| {
                Ok(like_regex(item, pattern))
            })
        }
        NodeKind::Exists(arg) => execute_exists(exec, arg, value),
        _ => Err(Error::Internal("invalid boolean jsonpath item type")),
    }
}

/// `? (pred)` as an item step: keep the current item when the predicate
/// is TRUE. In lax mode an array target is tested element by element.
pub(crate) fn execute_filter(
    exec: &mut Executor,
    node: &Node,
    pred: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    if unwrap && let Value::Array(elements) = value {
        return exec.execute_unwrap_array(node, elements, found, false);
    }
    let outcome = execute_nested_bool(exec, pred, value)?;
    if outcome != Ternary::True {
        return Ok(ExecStatus::NotFound);
    }
    exec.execute_next(node.next.as_deref(), value, found)
}

/// Binds `@` to the candidate for the duration of the predicate.
fn execute_nested_bool(
    exec: &mut Executor,
    pred: &Node,
    value: &Value,
) -> Result<Ternary, Error> {
    exec.with_current(value, |exec| execute_bool(exec, pred, value, false))
}

/// The generic predicate harness: evaluates operand sequences with
/// throwing off, then applies the callback across the cross product.
/// Lax mode short-circuits on the first TRUE; strict mode keeps scanning
/// so a later error can still force UNKNOWN.
fn execute_predicate(
    exec: &mut Executor,
    left: &Node,
    right: Option<&Node>,
    value: &Value,
    unwrap_right: bool,
    pred: impl Fn(&mut Executor, &Value, Option<&Value>) -> Result<Ternary, Error>,
) -> Result<Ternary, Error> {
    let mut lseq = ValueList::default();
    let res = exec.execute_unwrap_result_no_throw(left, value, true, &mut lseq)?;
    if res == ExecStatus::Failed {
        return Ok(Ternary::Unknown);
    }

    let mut rseq = ValueList::default();
    if let Some(right) = right {
        let res = exec.execute_unwrap_result_no_throw(right, value, unwrap_right, &mut rseq)?;
        if res == ExecStatus::Failed {
            return Ok(Ternary::Unknown);
        }
    }

    let mut error = false;
    let mut found = false;
    for lval in lseq.iter() {
        let rvals: Vec<Option<&Value>> = if right.is_some() {
            rseq.iter().map(Some).collect()
        } else {
            vec![None]
        };
        for rval in rvals {
            let outcome = pred(exec, lval, rval)?;
            if outcome == Ternary::Unknown {
                if exec.strict_absence_of_errors() {
                    return Ok(Ternary::Unknown);
                }
                error = true;
            } else if outcome == Ternary::True {
                if !exec.strict_absence_of_errors() {
                    return Ok(Ternary::True);
                }
                found = true;
            }
        }
    }
    if found {
        // Only reachable in strict mode: every pair was error-free.
        return Ok(Ternary::True);
    }
    if error {
        return Ok(Ternary::Unknown);
    }
    Ok(Ternary::False)
}

/// `exists(expr)`: TRUE when the subpath selects anything, FALSE when it
/// selects nothing, UNKNOWN when it fails a suppressible error. Strict
/// mode materializes the whole result so late errors are not missed.
fn execute_exists(exec: &mut Executor, arg: &Node, value: &Value) -> Result<Ternary, Error> {
    if exec.strict_absence_of_errors() {
        let mut vals = ValueList::default();
        let res = exec.with_ignored_structural_errors(|exec| {
            exec.execute_unwrap_result_no_throw(arg, value, false, &mut vals)
        })?;
        if res == ExecStatus::Failed {
            return Ok(Ternary::Unknown);
        }
        Ok(Ternary::from_bool(!vals.is_empty()))
    } else {
        let res = exec
            .with_ignored_structural_errors(|exec| exec.execute_no_throw(arg, value, None))?;
        Ok(match res {
            ExecStatus::Ok => Ternary::True,
            ExecStatus::NotFound => Ternary::False,
            ExecStatus::Failed => Ternary::Unknown,
        })
    }
}

fn starts_with(whole: &Value, prefix: &Value) -> Ternary {
    match (whole, prefix) {
        (Value::String(whole), Value::String(prefix)) => {
            Ternary::from_bool(whole.starts_with(prefix.as_str()))
        }
        _ => Ternary::Unknown,
    }
}

fn like_regex(item: &Value, pattern: &RegexPattern) -> Ternary {
    match item {
        Value::String(s) => Ternary::from_bool(pattern.re.is_match(s)),
        _ => Ternary::Unknown,
    }
}
