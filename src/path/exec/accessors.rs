/// Accessor handlers: member access, wildcards, array subscripts, and
/// recursive descent.
use crate::error::Error;
use crate::value::Value;

use super::super::{Node, Subscript};
use super::{ExecResult, ExecStatus, Executor, ValueList};

/// `.name` — object member access, with lax-mode array unwrap.
pub(crate) fn execute_key(
    exec: &mut Executor,
    node: &Node,
    name: &str,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    match value {
        Value::Object(_) => match value.object_get(name) {
            Some(member) => exec.execute_next(node.next.as_deref(), member, found),
            None => exec.structural(Error::MemberNotFound(name.to_string())),
        },
        Value::Array(elements) if unwrap => exec.execute_unwrap_array(node, elements, found, false),
        _ => exec.structural(Error::MemberAccessor),
    }
}

/// `.*` — every member value of an object.
pub(crate) fn execute_any_key(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
    unwrap: bool,
) -> ExecResult {
    match value {
        Value::Object(_) => {
            let unwrap_next = exec.auto_unwrap();
            exec.execute_any_item(node.next.as_deref(), value, found, 1, 1, 1, false, unwrap_next)
        }
        Value::Array(elements) if unwrap => exec.execute_unwrap_array(node, elements, found, false),
        _ => exec.structural(Error::WildcardMemberAccessor),
    }
}

/// `[*]` — every element of an array; non-arrays auto-wrap in lax mode.
pub(crate) fn execute_any_array(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
    found: Option<&mut ValueList>,
) -> ExecResult {
    match value {
        Value::Array(_) => {
            let unwrap_next = exec.auto_unwrap();
            exec.execute_any_item(node.next.as_deref(), value, found, 1, 1, 1, false, unwrap_next)
        }
        _ if exec.auto_wrap() => exec.execute_next(node.next.as_deref(), value, found),
        _ => exec.structural(Error::WildcardArrayAccessor),
    }
}

/// `[subscript, …]` — index and range subscripts. Strict mode rejects
/// out-of-bounds subscripts outright; lax mode clips them to the array.
pub(crate) fn execute_array_index(
    exec: &mut Executor,
    node: &Node,
    subscripts: &[Subscript],
    value: &Value,
    found: Option<&mut ValueList>,
) -> ExecResult {
    if !matches!(value, Value::Array(_)) && !exec.auto_wrap() {
        return exec.structural(Error::ArrayAccessor);
    }
    let size = match value {
        Value::Array(elements) => elements.len() as i64,
        _ => 1,
    };
    exec.with_array_size(size, |exec| {
        index_subscripts(exec, node, subscripts, value, size, found)
    })
}

fn index_subscripts(
    exec: &mut Executor,
    node: &Node,
    subscripts: &[Subscript],
    value: &Value,
    size: i64,
    mut found: Option<&mut ValueList>,
) -> ExecResult {
    let has_next = node.next.is_some();
    let mut ret = ExecStatus::NotFound;

    for subscript in subscripts {
        let from = match subscript_index(exec, &subscript.from, value)? {
            Some(index) => index,
            None => return Ok(ExecStatus::Failed),
        };
        let to = match &subscript.to {
            Some(to_node) => match subscript_index(exec, to_node, value)? {
                Some(index) => index,
                None => return Ok(ExecStatus::Failed),
            },
            None => from,
        };

        let mut index_from = from as i64;
        let mut index_to = to as i64;
        if !exec.is_lax() && (index_from < 0 || index_from > index_to || index_to >= size) {
            return exec.throw(Error::SubscriptOutOfBounds);
        }
        index_from = index_from.max(0);
        index_to = index_to.min(size - 1);

        for index in index_from..=index_to {
            exec.check_cancelled()?;
            let element = match value {
                Value::Array(elements) => match elements.get(index as usize) {
                    Some(element) => element,
                    None => continue,
                },
                // auto-wrapped singleton
                _ => value,
            };
            if !has_next && found.is_none() {
                return Ok(ExecStatus::Ok);
            }
            let res = exec.execute_next(node.next.as_deref(), element, found.as_deref_mut())?;
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
    }
    Ok(ret)
}

/// Evaluates one subscript expression to a 32-bit index, truncating
/// toward zero. `None` means a suppressed failure that the caller must
/// surface as FAILED.
fn subscript_index(
    exec: &mut Executor,
    node: &Node,
    value: &Value,
) -> Result<Option<i32>, Error> {
    let mut seq = ValueList::default();
    let res = exec.execute(node, value, Some(&mut seq))?;
    if res == ExecStatus::Failed {
        return Ok(None);
    }
    let single = match seq.head() {
        Some(v) if seq.len() == 1 && v.is_number() => v,
        _ => return exec.throw(Error::SubscriptNotNumeric).map(|_| None),
    };
    let index = match single {
        Value::Int(i) => *i as f64,
        Value::Double(f) => f.trunc(),
        Value::Numeric(text) => match text.parse::<f64>() {
            Ok(f) => f.trunc(),
            Err(_) => return exec.throw(Error::SubscriptOutOfRange).map(|_| None),
        },
        _ => return Err(Error::Internal("non-numeric value reached subscript conversion")),
    };
    if !index.is_finite() || index < i32::MIN as f64 || index > i32::MAX as f64 {
        return exec.throw(Error::SubscriptOutOfRange).map(|_| None);
    }
    Ok(Some(index as i32))
}

/// `.**{first to last}` — recursive descent. The level-0 pre-pass emits
/// the current item itself with structural errors ignored, so descent
/// into a scalar cannot fail even in strict mode.
pub(crate) fn execute_any(
    exec: &mut Executor,
    node: &Node,
    first: u32,
    last: u32,
    value: &Value,
    mut found: Option<&mut ValueList>,
) -> ExecResult {
    let next = node.next.as_deref();
    let mut ret = ExecStatus::NotFound;

    if first == 0 {
        let res = exec.with_ignored_structural_errors(|exec| {
            exec.execute_next(next, value, found.as_deref_mut())
        })?;
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

    if matches!(value, Value::Array(_) | Value::Object(_)) {
        let unwrap_next = exec.auto_unwrap();
        let res = exec.execute_any_item(next, value, found, 1, first, last, true, unwrap_next)?;
        if res == ExecStatus::Failed {
            return Ok(res);
        }
        if res == ExecStatus::Ok {
            ret = ExecStatus::Ok;
        }
    }
    Ok(ret)
}
