/// The jsonpath executor: a tree walk over the parsed AST against a
/// decoded JSON value.
///
/// Every node handler follows the "next item" protocol: once it has a
/// value for the step, it calls `execute_next`, which either dispatches
/// the node's `next` link on that value or appends it to the result list.
/// Existence-only queries pass no result list, so producers can
/// short-circuit on the first hit.
///
/// Three statuses flow back up: `Ok` (produced something), `NotFound`
/// (structurally fine, nothing matched), `Failed` (a suppressible error
/// fired while error throwing was off). Non-suppressible errors travel as
/// `Err` and always reach the caller.
pub(crate) mod accessors;
pub(crate) mod arith;
pub(crate) mod compare;
pub(crate) mod methods;
pub(crate) mod predicate;

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;
use crate::value::Value;

use super::{Mode, Node, NodeKind, Path};

pub use compare::Ternary;

/// Base-object id multiplier: `.keyvalue()` ids are
/// `base_id * 10^10 + container offset`.
const OBJECT_ID_STEP: i64 = 10_000_000_000;

/// Base-object id reserved for values bound through `$name` variables.
const VARIABLE_BASE_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecStatus {
    Ok,
    NotFound,
    Failed,
}

pub(crate) type ExecResult = Result<ExecStatus, Error>;

/// Append-only buffer of selected items.
#[derive(Debug, Default)]
pub(crate) struct ValueList {
    items: Vec<Value>,
}

impl ValueList {
    pub fn append(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn head(&self) -> Option<&Value> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }
}

/// Options for one evaluation: variable bindings, error suppression,
/// time zone usage, and an optional cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    vars: HashMap<String, Value>,
    silent: bool,
    use_tz: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `$name` for the evaluation.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_vars(mut self, vars: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.vars.extend(vars);
        self
    }

    /// Suppresses suppressible errors; the evaluation then reports empty
    /// or NULL instead of failing.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Permits datetime conversions that cross the tz/naive boundary.
    pub fn with_tz(mut self) -> Self {
        self.use_tz = true;
        self
    }

    /// Installs a cancellation flag, checked on every node entry and on
    /// every iteration of unbounded accessors.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl Path {
    /// Evaluates the path and returns all selected items in evaluation
    /// order. With `silent`, a suppressed error yields an empty list.
    pub fn query(&self, input: &Value, opts: &QueryOptions) -> Result<Vec<Value>, Error> {
        let mut found = ValueList::default();
        let mut exec = Executor::new(self, input, opts);
        let status = exec.execute(&self.root, input, Some(&mut found))?;
        if status == ExecStatus::Failed {
            return Ok(Vec::new());
        }
        Ok(found.into_vec())
    }

    /// Evaluates the path and returns the first selected item, if any.
    pub fn first(&self, input: &Value, opts: &QueryOptions) -> Result<Option<Value>, Error> {
        Ok(self.query(input, opts)?.into_iter().next())
    }

    /// Whether the path selects at least one item. `None` is the SQL NULL
    /// outcome: evaluation failed under suppression.
    pub fn exists(&self, input: &Value, opts: &QueryOptions) -> Result<Option<bool>, Error> {
        let mut exec = Executor::new(self, input, opts);
        let status = exec.execute(&self.root, input, None)?;
        Ok(match status {
            ExecStatus::Ok => Some(true),
            ExecStatus::NotFound => Some(false),
            ExecStatus::Failed => None,
        })
    }

    /// Evaluates a predicate path that must produce exactly one boolean.
    /// A single JSON null maps to `None`; any other shape is the
    /// "single boolean result is expected" error, or `None` when silent.
    pub fn matches(&self, input: &Value, opts: &QueryOptions) -> Result<Option<bool>, Error> {
        let mut found = ValueList::default();
        let mut exec = Executor::new(self, input, opts);
        let status = exec.execute(&self.root, input, Some(&mut found))?;
        if status != ExecStatus::Failed && found.len() == 1 {
            match found.head() {
                Some(Value::Bool(b)) => return Ok(Some(*b)),
                Some(Value::Null) => return Ok(None),
                _ => {}
            }
        }
        if opts.silent {
            Ok(None)
        } else {
            Err(Error::SingleBooleanExpected)
        }
    }
}

/// Identity of the container `.keyvalue()` ids are computed against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BaseObject {
    addr: usize,
    id: i64,
}

pub(crate) struct Executor<'a> {
    mode: Mode,
    vars: &'a HashMap<String, Value>,
    root: &'a Value,
    /// The value `@` is bound to inside a filter.
    current: Value,
    base_object: BaseObject,
    last_generated_object_id: i64,
    /// Sequential `.keyvalue()` offsets, keyed by container address.
    container_offsets: HashMap<usize, i64>,
    /// Size of the array being subscripted, for `last`. `None` outside
    /// any subscript context.
    innermost_array_size: Option<i64>,
    /// Structural errors fold to NOT_FOUND while set: lax mode, the
    /// recursive-descent pre-pass, and `exists()` evaluation.
    ignore_structural_errors: bool,
    /// When off, suppressible errors fold to FAILED instead of Err.
    throw_errors: bool,
    use_tz: bool,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(path: &'a Path, input: &'a Value, opts: &'a QueryOptions) -> Self {
        Executor {
            mode: path.mode,
            vars: &opts.vars,
            root: input,
            current: input.clone(),
            base_object: BaseObject {
                addr: addr_of(input),
                id: 0,
            },
            last_generated_object_id: 1,
            container_offsets: HashMap::new(),
            innermost_array_size: None,
            ignore_structural_errors: path.mode == Mode::Lax,
            throw_errors: !opts.silent,
            use_tz: opts.use_tz,
            cancel: opts.cancel.as_deref(),
        }
    }

    pub(crate) fn is_lax(&self) -> bool {
        self.mode == Mode::Lax
    }

    /// Lax mode iterates arrays for object accessors and scalar methods.
    pub(crate) fn auto_unwrap(&self) -> bool {
        self.is_lax()
    }

    /// Lax mode wraps non-arrays for array accessors.
    pub(crate) fn auto_wrap(&self) -> bool {
        self.is_lax()
    }

    /// Strict mode must observe every error before trusting a predicate
    /// outcome.
    pub(crate) fn strict_absence_of_errors(&self) -> bool {
        self.mode == Mode::Strict
    }

    pub(crate) fn use_tz(&self) -> bool {
        self.use_tz
    }

    /// Surfaces an error when throwing is on, folds it to FAILED when it
    /// is off. Errors the `silent` option may never swallow surface
    /// regardless.
    pub(crate) fn throw(&self, err: Error) -> ExecResult {
        if self.throw_errors || !err.can_silence() {
            Err(err)
        } else {
            Ok(ExecStatus::Failed)
        }
    }

    /// A structural error: swallowed to NOT_FOUND when structural errors
    /// are ignored, otherwise handled like any suppressible error.
    pub(crate) fn structural(&self, err: Error) -> ExecResult {
        if self.ignore_structural_errors {
            Ok(ExecStatus::NotFound)
        } else {
            self.throw(err)
        }
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), Error> {
        if let Some(flag) = self.cancel
            && flag.load(Ordering::Relaxed)
        {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Rebinds the `.keyvalue()` base object, returning the previous
    /// binding for the caller to restore.
    pub(crate) fn set_base_object(&mut self, value: &Value, id: i64) -> BaseObject {
        mem::replace(
            &mut self.base_object,
            BaseObject {
                addr: addr_of(value),
                id,
            },
        )
    }

    pub(crate) fn restore_base_object(&mut self, saved: BaseObject) {
        self.base_object = saved;
    }

    /// `.keyvalue()` id for a target container: the base id scaled by
    /// 10^10 plus a stable offset. The base object itself is offset 0;
    /// other containers get small sequential offsets on first use.
    pub(crate) fn keyvalue_id(&mut self, target: &Value) -> i64 {
        let addr = addr_of(target);
        let offset = if addr == self.base_object.addr {
            0
        } else {
            let next = self.container_offsets.len() as i64 + 1;
            *self.container_offsets.entry(addr).or_insert(next)
        };
        self.base_object.id * OBJECT_ID_STEP + offset
    }

    /// Bumps the generated-object counter and returns the fresh base id
    /// for a synthesized `.keyvalue()` envelope.
    pub(crate) fn next_generated_object_id(&mut self) -> i64 {
        self.last_generated_object_id += 1;
        self.last_generated_object_id
    }

    // --- dispatch -------------------------------------------------------

    pub(crate) fn execute(
        &mut self,
        node: &Node,
        value: &Value,
        found: Option<&mut ValueList>,
    ) -> ExecResult {
        let unwrap = self.auto_unwrap();
        self.execute_unwrap_target(node, value, found, unwrap)
    }

    pub(crate) fn execute_unwrap_target(
        &mut self,
        node: &Node,
        value: &Value,
        mut found: Option<&mut ValueList>,
        unwrap: bool,
    ) -> ExecResult {
        self.check_cancelled()?;
        let next = node.next.as_deref();
        match &node.kind {
            NodeKind::Root => {
                let root = self.root;
                let saved = self.set_base_object(root, 0);
                let res = self.execute_next(next, root, found);
                self.restore_base_object(saved);
                res
            }
            NodeKind::Current => {
                let current = self.current.clone();
                self.execute_next(next, &current, found)
            }
            NodeKind::Last => {
                let Some(size) = self.innermost_array_size else {
                    return Err(Error::LastOutsideSubscript);
                };
                self.execute_next(next, &Value::Int(size - 1), found)
            }
            NodeKind::Null => self.execute_next(next, &Value::Null, found),
            NodeKind::Bool(b) => self.execute_next(next, &Value::Bool(*b), found),
            NodeKind::Int(n) => self.execute_next(next, &Value::Int(*n), found),
            NodeKind::Numeric(text) => {
                let v = Value::Numeric(text.clone());
                self.execute_next(next, &v, found)
            }
            NodeKind::String(s) => {
                let v = Value::String(s.clone());
                self.execute_next(next, &v, found)
            }
            NodeKind::Variable(name) => {
                let vars = self.vars;
                let Some(var) = vars.get(name) else {
                    return Err(Error::VariableNotFound(name.clone()));
                };
                let saved = self.set_base_object(var, VARIABLE_BASE_ID);
                let res = self.execute_next(next, var, found);
                self.restore_base_object(saved);
                res
            }
            NodeKind::Key(name) => accessors::execute_key(self, node, name, value, found, unwrap),
            NodeKind::AnyKey => accessors::execute_any_key(self, node, value, found, unwrap),
            NodeKind::AnyArray => accessors::execute_any_array(self, node, value, found),
            NodeKind::ArrayIndex(subscripts) => {
                accessors::execute_array_index(self, node, subscripts, value, found)
            }
            NodeKind::Any { first, last } => {
                accessors::execute_any(self, node, *first, *last, value, found)
            }
            NodeKind::Filter(pred) => {
                predicate::execute_filter(self, node, pred, value, found, unwrap)
            }
            NodeKind::UnaryPlus(operand) => {
                arith::execute_unary(self, node, operand, false, value, found)
            }
            NodeKind::UnaryMinus(operand) => {
                arith::execute_unary(self, node, operand, true, value, found)
            }
            NodeKind::Arith(op, left, right) => {
                arith::execute_binary(self, node, *op, left, right, value, found)
            }
            NodeKind::Method(method) => {
                methods::execute_method(self, node, method, value, found, unwrap)
            }
            NodeKind::And(..)
            | NodeKind::Or(..)
            | NodeKind::Not(..)
            | NodeKind::IsUnknown(..)
            | NodeKind::Compare(..)
            | NodeKind::StartsWith(..)
            | NodeKind::LikeRegex(..)
            | NodeKind::Exists(..) => {
                let outcome = predicate::execute_bool(self, node, value, true)?;
                self.append_bool_result(node, outcome, found.take())
            }
        }
    }

    /// The "next item" protocol: dispatch the next node on `value`, or
    /// append it as a terminal item, or — with neither a next step nor a
    /// result list — report that a value would have been produced.
    pub(crate) fn execute_next(
        &mut self,
        next: Option<&Node>,
        value: &Value,
        found: Option<&mut ValueList>,
    ) -> ExecResult {
        match next {
            Some(node) => self.execute(node, value, found),
            None => {
                if let Some(list) = found {
                    list.append(value.clone());
                }
                Ok(ExecStatus::Ok)
            }
        }
    }

    /// Converts a predicate outcome to a value for the rest of the chain
    /// (UNKNOWN becomes JSON null).
    fn append_bool_result(
        &mut self,
        node: &Node,
        outcome: Ternary,
        found: Option<&mut ValueList>,
    ) -> ExecResult {
        let next = node.next.as_deref();
        if next.is_none() && found.is_none() {
            return Ok(ExecStatus::Ok);
        }
        let value = match outcome {
            Ternary::Unknown => Value::Null,
            Ternary::True => Value::Bool(true),
            Ternary::False => Value::Bool(false),
        };
        self.execute_next(next, &value, found)
    }

    /// Evaluates a node fully and, in lax mode, unwraps top-level array
    /// results one level. Used for operand sequences.
    pub(crate) fn execute_unwrap_result(
        &mut self,
        node: &Node,
        value: &Value,
        unwrap: bool,
        found: &mut ValueList,
    ) -> ExecResult {
        if unwrap && self.auto_unwrap() {
            let mut seq = ValueList::default();
            let res = self.execute(node, value, Some(&mut seq))?;
            if res == ExecStatus::Failed {
                return Ok(res);
            }
            for item in seq.into_vec() {
                match item {
                    Value::Array(elems) => {
                        for elem in elems {
                            found.append(elem);
                        }
                    }
                    other => found.append(other),
                }
            }
            return Ok(res);
        }
        self.execute(node, value, Some(found))
    }

    /// Operand evaluation with throwing disabled: suppressible errors
    /// fold to FAILED so predicates can turn them into UNKNOWN.
    pub(crate) fn execute_unwrap_result_no_throw(
        &mut self,
        node: &Node,
        value: &Value,
        unwrap: bool,
        found: &mut ValueList,
    ) -> ExecResult {
        let saved = mem::replace(&mut self.throw_errors, false);
        let res = self.execute_unwrap_result(node, value, unwrap, found);
        self.throw_errors = saved;
        res
    }

    /// Existence probe with throwing disabled.
    pub(crate) fn execute_no_throw(
        &mut self,
        node: &Node,
        value: &Value,
        found: Option<&mut ValueList>,
    ) -> ExecResult {
        let saved = mem::replace(&mut self.throw_errors, false);
        let res = self.execute(node, value, found);
        self.throw_errors = saved;
        res
    }

    /// Applies the node to each element of an array target (lax-mode
    /// auto-unwrap). `unwrap_elements` guards against double-unwrap.
    pub(crate) fn execute_unwrap_array(
        &mut self,
        node: &Node,
        elements: &[Value],
        mut found: Option<&mut ValueList>,
        unwrap_elements: bool,
    ) -> ExecResult {
        let mut ret = ExecStatus::NotFound;
        for elem in elements {
            self.check_cancelled()?;
            let res = self.execute_unwrap_target(node, elem, found.as_deref_mut(), unwrap_elements)?;
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

    /// Enumerates container children level by level, the shared engine of
    /// the wildcard accessors and recursive descent. `next` receives
    /// every child at levels within `[first, last]`; child containers are
    /// descended into while `level < last`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn execute_any_item(
        &mut self,
        next: Option<&Node>,
        container: &Value,
        mut found: Option<&mut ValueList>,
        level: u32,
        first: u32,
        last: u32,
        ignore_structural: bool,
        unwrap_next: bool,
    ) -> ExecResult {
        let mut ret = ExecStatus::NotFound;
        if level > last {
            return Ok(ret);
        }
        let children: Vec<&Value> = match container {
            Value::Array(items) => items.iter().collect(),
            Value::Object(fields) => fields.iter().map(|(_, v)| v).collect(),
            _ => return Ok(ret),
        };
        for child in children {
            self.check_cancelled()?;
            if level >= first {
                let res = match next {
                    Some(node) => {
                        let saved = if ignore_structural {
                            Some(mem::replace(&mut self.ignore_structural_errors, true))
                        } else {
                            None
                        };
                        let res =
                            self.execute_unwrap_target(node, child, found.as_deref_mut(), unwrap_next);
                        if let Some(saved) = saved {
                            self.ignore_structural_errors = saved;
                        }
                        res?
                    }
                    None => match found.as_deref_mut() {
                        Some(list) => {
                            list.append(child.clone());
                            ExecStatus::Ok
                        }
                        None => return Ok(ExecStatus::Ok),
                    },
                };
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
            if level < last && matches!(child, Value::Array(_) | Value::Object(_)) {
                let res = self.execute_any_item(
                    next,
                    child,
                    found.as_deref_mut(),
                    level + 1,
                    first,
                    last,
                    ignore_structural,
                    unwrap_next,
                )?;
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

    // --- scoped state used by the accessor/predicate modules ------------

    pub(crate) fn with_array_size<T>(
        &mut self,
        size: i64,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = mem::replace(&mut self.innermost_array_size, Some(size));
        let result = body(self);
        self.innermost_array_size = saved;
        result
    }

    pub(crate) fn with_current<T>(
        &mut self,
        value: &Value,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = mem::replace(&mut self.current, value.clone());
        let result = body(self);
        self.current = saved;
        result
    }

    pub(crate) fn with_ignored_structural_errors<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = mem::replace(&mut self.ignore_structural_errors, true);
        let result = body(self);
        self.ignore_structural_errors = saved;
        result
    }
}

fn addr_of(value: &Value) -> usize {
    value as *const Value as usize
}
