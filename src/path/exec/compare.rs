/// Three-valued comparison of JSON items.
///
/// UNKNOWN arises wherever SQL would produce NULL: mixed-type operands,
/// containers, incomparable datetime kinds. Null compares equal to null
/// and unequal to everything else — never UNKNOWN.
use std::cmp::Ordering;

use crate::value::Value;

use super::super::CmpOp;
use super::arith::{self, Num};

/// Kleene three-valued logic outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ternary {
    True,
    False,
    Unknown,
}

impl Ternary {
    pub fn from_bool(b: bool) -> Ternary {
        if b { Ternary::True } else { Ternary::False }
    }

    pub fn and(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::False, _) | (_, Ternary::False) => Ternary::False,
            (Ternary::True, Ternary::True) => Ternary::True,
            _ => Ternary::Unknown,
        }
    }

    pub fn or(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::True, _) | (_, Ternary::True) => Ternary::True,
            (Ternary::False, Ternary::False) => Ternary::False,
            _ => Ternary::Unknown,
        }
    }

    pub fn not(self) -> Ternary {
        match self {
            Ternary::True => Ternary::False,
            Ternary::False => Ternary::True,
            Ternary::Unknown => Ternary::Unknown,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum TypeClass {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Datetime,
}

fn class_of(value: &Value) -> TypeClass {
    match value {
        Value::Null => TypeClass::Null,
        Value::Bool(_) => TypeClass::Bool,
        Value::Int(_) | Value::Double(_) | Value::Numeric(_) => TypeClass::Number,
        Value::String(_) => TypeClass::String,
        Value::Array(_) => TypeClass::Array,
        Value::Object(_) => TypeClass::Object,
        Value::Datetime(_) => TypeClass::Datetime,
    }
}

/// Compares two items under a comparison operator.
pub(crate) fn compare_values(op: CmpOp, left: &Value, right: &Value, use_tz: bool) -> Ternary {
    let lclass = class_of(left);
    let rclass = class_of(right);

    if lclass != rclass {
        // Null against non-null: != is TRUE, everything else FALSE.
        if lclass == TypeClass::Null || rclass == TypeClass::Null {
            return Ternary::from_bool(op == CmpOp::Ne);
        }
        return Ternary::Unknown;
    }

    let ordering = match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (Value::Datetime(a), Value::Datetime(b)) => match a.compare(b, use_tz) {
            Some(ordering) => Some(ordering),
            None => return Ternary::Unknown,
        },
        _ if lclass == TypeClass::Number => match (arith::value_number(left), arith::value_number(right))
        {
            (Some(a), Some(b)) => compare_numbers(a, b),
            _ => return Ternary::Unknown,
        },
        // Containers are not comparable.
        _ => return Ternary::Unknown,
    };

    let Some(ordering) = ordering else {
        return Ternary::Unknown;
    };
    Ternary::from_bool(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

/// Numbers compare in their common promoted type: i64 when both sides
/// are integers, f64 otherwise.
fn compare_numbers(a: Num, b: Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}
