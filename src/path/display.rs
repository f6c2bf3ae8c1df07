/// Rendering a parsed path back to jsonpath text.
///
/// Binary and unary operators are always parenthesized, so the output is
/// unambiguous without tracking precedence; the parser accepts everything
/// printed here. Keys and variables are quoted only when they are not
/// identifier-shaped.
use std::fmt;
use std::fmt::Display;

use super::{Method, Mode, Node, NodeKind, Path, Subscript, UNBOUNDED_LEVEL};

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mode == Mode::Strict {
            f.write_str("strict ")?;
        }
        self.root.fmt(f)
    }
}

// The `next` chain carries its own separators (`.name`, `[...]`, `?(…)`),
// so a node prints its kind and then its chain with no glue in between.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_kind(f, &self.kind)?;
        if let Some(next) = &self.next {
            next.fmt(f)?;
        }
        Ok(())
    }
}

fn write_kind(f: &mut fmt::Formatter<'_>, kind: &NodeKind) -> fmt::Result {
    match kind {
        NodeKind::Root => f.write_str("$"),
        NodeKind::Current => f.write_str("@"),
        NodeKind::Last => f.write_str("last"),
        NodeKind::Null => f.write_str("null"),
        NodeKind::Bool(true) => f.write_str("true"),
        NodeKind::Bool(false) => f.write_str("false"),
        NodeKind::Int(n) => write!(f, "{n}"),
        NodeKind::Numeric(text) => f.write_str(text),
        NodeKind::String(s) => write_quoted(f, s),
        NodeKind::Variable(name) => {
            f.write_str("$")?;
            write_name(f, name)
        }
        NodeKind::Key(name) => {
            f.write_str(".")?;
            write_name(f, name)
        }
        NodeKind::AnyKey => f.write_str(".*"),
        NodeKind::AnyArray => f.write_str("[*]"),
        NodeKind::ArrayIndex(subscripts) => {
            f.write_str("[")?;
            for (i, Subscript { from, to }) in subscripts.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                from.fmt(f)?;
                if let Some(to) = to {
                    f.write_str(" to ")?;
                    to.fmt(f)?;
                }
            }
            f.write_str("]")
        }
        NodeKind::Any { first, last } => {
            if *first == 0 && *last == UNBOUNDED_LEVEL {
                return f.write_str(".**");
            }
            f.write_str(".**{")?;
            write_level(f, *first)?;
            if last != first {
                f.write_str(" to ")?;
                write_level(f, *last)?;
            }
            f.write_str("}")
        }
        NodeKind::Filter(pred) => {
            f.write_str("?(")?;
            pred.fmt(f)?;
            f.write_str(")")
        }
        NodeKind::Exists(arg) => {
            f.write_str("exists (")?;
            arg.fmt(f)?;
            f.write_str(")")
        }
        NodeKind::Not(arg) => {
            f.write_str("!(")?;
            arg.fmt(f)?;
            f.write_str(")")
        }
        NodeKind::IsUnknown(arg) => {
            f.write_str("(")?;
            arg.fmt(f)?;
            f.write_str(") is unknown")
        }
        NodeKind::And(l, r) => write_binary(f, l, "&&", r),
        NodeKind::Or(l, r) => write_binary(f, l, "||", r),
        NodeKind::Compare(op, l, r) => write_binary(f, l, op.name(), r),
        NodeKind::Arith(op, l, r) => write_binary(f, l, op.name(), r),
        NodeKind::UnaryPlus(arg) => {
            f.write_str("(+")?;
            arg.fmt(f)?;
            f.write_str(")")
        }
        NodeKind::UnaryMinus(arg) => {
            f.write_str("(-")?;
            arg.fmt(f)?;
            f.write_str(")")
        }
        NodeKind::StartsWith(l, r) => {
            f.write_str("(")?;
            l.fmt(f)?;
            f.write_str(" starts with ")?;
            r.fmt(f)?;
            f.write_str(")")
        }
        NodeKind::LikeRegex(operand, pattern) => {
            f.write_str("(")?;
            operand.fmt(f)?;
            f.write_str(" like_regex ")?;
            write_quoted(f, &pattern.pattern)?;
            if !pattern.flags.is_empty() {
                f.write_str(" flag ")?;
                write_quoted(f, &pattern.flags)?;
            }
            f.write_str(")")
        }
        NodeKind::Method(method) => write_method(f, method),
    }
}

fn write_binary(f: &mut fmt::Formatter<'_>, l: &Node, op: &str, r: &Node) -> fmt::Result {
    f.write_str("(")?;
    l.fmt(f)?;
    write!(f, " {op} ")?;
    r.fmt(f)?;
    f.write_str(")")
}

fn write_level(f: &mut fmt::Formatter<'_>, level: u32) -> fmt::Result {
    if level == UNBOUNDED_LEVEL {
        f.write_str("last")
    } else {
        write!(f, "{level}")
    }
}

fn write_method(f: &mut fmt::Formatter<'_>, method: &Method) -> fmt::Result {
    match method {
        Method::Time(arg)
        | Method::TimeTz(arg)
        | Method::Timestamp(arg)
        | Method::TimestampTz(arg) => {
            write!(f, ".{}(", method.name())?;
            if let Some(arg) = arg {
                arg.fmt(f)?;
            }
            f.write_str(")")
        }
        Method::Decimal { precision, scale } => {
            f.write_str(".decimal(")?;
            if let Some(precision) = precision {
                precision.fmt(f)?;
                if let Some(scale) = scale {
                    f.write_str(", ")?;
                    scale.fmt(f)?;
                }
            }
            f.write_str(")")
        }
        Method::Datetime(template) => {
            f.write_str(".datetime(")?;
            if let Some(template) = template {
                write_quoted(f, template)?;
            }
            f.write_str(")")
        }
        _ => write!(f, ".{}()", method.name()),
    }
}

/// Member/variable names print bare when identifier-shaped.
fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let ident_shaped = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ident_shaped {
        f.write_str(name)
    } else {
        write_quoted(f, name)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

#[cfg(test)]
mod tests {
    use crate::path::parse;

    fn round_trip(input: &str) {
        let path = parse(input).unwrap_or_else(|e| panic!("parse {input}: {e}"));
        let printed = path.to_string();
        let reparsed =
            parse(&printed).unwrap_or_else(|e| panic!("reparse {printed}: {e}"));
        assert_eq!(printed, reparsed.to_string(), "unstable print for {input}");
    }

    #[test]
    fn round_trips_accessors() {
        round_trip("$.a.b[*].c");
        round_trip("strict $.*[0, 2 to last]");
        round_trip("$.**{2 to last}.x");
        round_trip(r#"$."odd key"[*]"#);
    }

    #[test]
    fn round_trips_predicates() {
        round_trip("$[*] ? (@ < $v)");
        round_trip(r#"$ ? (@.a starts with "ab" && exists(@.b))"#);
        round_trip(r#"$ ? ((@.x like_regex "^a.*$" flag "im") is unknown)"#);
        round_trip("$ ? (!(@.a == 1) || @.b != 2)");
    }

    #[test]
    fn round_trips_methods_and_arithmetic() {
        round_trip("($.x + 1).abs().ceiling()");
        round_trip("$.x.decimal(10, -2)");
        round_trip("$.ts.timestamp_tz(3)");
        round_trip("(-$.n).floor()");
        round_trip("$[2.5 - 1 to $.size() - 2]");
    }

    #[test]
    fn renders_expected_text() {
        let path = parse("$[*]?(@<12)").unwrap();
        assert_eq!(path.to_string(), "$[*]?((@ < 12))");
        let strict = parse("strict $.a").unwrap();
        assert_eq!(strict.to_string(), "strict $.a");
    }
}
