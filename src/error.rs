/// Execution error taxonomy.
///
/// Two classes matter to callers: errors the `silent` option may suppress
/// (structural mismatches, method type mismatches, numeric range, datetime
/// parse, subscript bounds) and errors that always surface (cancellation,
/// missing variable, LAST outside a subscript, the reserved
/// `.datetime(template)` form, internal invariant breaks). The message
/// strings are part of the compatibility contract and must not drift.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("JSON object does not contain key \"{0}\"")]
    MemberNotFound(String),

    #[error("jsonpath member accessor can only be applied to an object")]
    MemberAccessor,

    #[error("jsonpath wildcard member accessor can only be applied to an object")]
    WildcardMemberAccessor,

    #[error("jsonpath wildcard array accessor can only be applied to an array")]
    WildcardArrayAccessor,

    #[error("jsonpath array accessor can only be applied to an array")]
    ArrayAccessor,

    #[error("jsonpath array subscript is out of bounds")]
    SubscriptOutOfBounds,

    #[error("jsonpath array subscript is out of integer range")]
    SubscriptOutOfRange,

    #[error("jsonpath array subscript is not a single numeric value")]
    SubscriptNotNumeric,

    #[error("division by zero")]
    DivisionByZero,

    #[error("{side} operand of jsonpath operator {op} is not a single numeric value")]
    BinaryOperandNotNumeric {
        side: &'static str,
        op: &'static str,
    },

    #[error("operand of unary jsonpath operator {0} is not a numeric value")]
    UnaryOperandNotNumeric(&'static str),

    #[error("jsonpath item method .{method}() can only be applied to {expected}")]
    MethodTargetMismatch {
        method: &'static str,
        expected: &'static str,
    },

    #[error("argument \"{arg}\" of jsonpath item method .{method}() is invalid for type {ty}")]
    InvalidMethodArgument {
        arg: String,
        method: &'static str,
        ty: &'static str,
    },

    #[error("NaN or Infinity is not allowed for jsonpath item method .{0}()")]
    NanOrInfinity(&'static str),

    #[error("{kind} format is not recognized: \"{value}\"")]
    DatetimeFormat { kind: &'static str, value: String },

    #[error(
        "cannot convert value from {from} to {to} without time zone usage. \
         HINT: Use WithTZ() option for time zone support"
    )]
    TimeZoneUsage {
        from: &'static str,
        to: &'static str,
    },

    #[error("time precision of jsonpath item method .{0}() is out of integer range")]
    TimePrecision(&'static str),

    #[error("precision of jsonpath item method .decimal() is out of integer range")]
    DecimalPrecisionInt,

    #[error("scale of jsonpath item method .decimal() is out of integer range")]
    DecimalScaleInt,

    #[error("NUMERIC precision {0} must be between 1 and 1000")]
    DecimalPrecision(i64),

    #[error("NUMERIC scale {0} must be between -1000 and 1000")]
    DecimalScale(i64),

    #[error("single boolean result is expected")]
    SingleBooleanExpected,

    #[error("could not find jsonpath variable \"{0}\"")]
    VariableNotFound(String),

    #[error("evaluating jsonpath LAST outside of array subscript")]
    LastOutsideSubscript,

    #[error(".datetime(template) is not yet supported")]
    DatetimeTemplate,

    #[error("jsonpath evaluation was cancelled")]
    Cancelled,

    #[error("invalid jsonpath item: {0}")]
    Internal(&'static str),
}

impl Error {
    /// Whether the `silent` query option is allowed to swallow this error.
    /// Cancellation, missing variables, LAST misuse, the reserved datetime
    /// template form, time-zone-usage violations, and internal invariant
    /// breaks always surface.
    pub fn can_silence(&self) -> bool {
        !matches!(
            self,
            Error::VariableNotFound(_)
                | Error::LastOutsideSubscript
                | Error::DatetimeTemplate
                | Error::TimeZoneUsage { .. }
                | Error::Cancelled
                | Error::Internal(_)
        )
    }
}
