/// Recursive descent parser for SQL/JSON path expressions.
///
/// Grammar (simplified, by falling precedence):
///   path     = ("lax" | "strict")? expr
///   expr     = and ("||" and)*
///   and      = not ("&&" not)*
///   not      = "!" not | cmp ("is" "unknown")*
///   cmp      = additive (cmp_op additive
///                        | "starts" "with" additive
///                        | "like_regex" STR ("flag" STR)?)?
///   additive = mul (("+" | "-") mul)*
///   mul      = unary (("*" | "/" | "%") unary)*
///   unary    = ("+" | "-") unary | postfix
///   postfix  = primary step*
///   step     = "." name | "." name "(" args ")" | ".*" | ".**" levels?
///            | "[" "*" "]" | "[" subscripts "]" | "?" "(" expr ")"
///   primary  = "$" | "$var" | "@" | "last" | literal | "(" expr ")"
///            | "exists" "(" expr ")"
///
/// `like_regex` patterns are compiled here, once, so execution never pays
/// for or fails at regex construction.
use anyhow::{Result, bail};

use super::lexer::Token;
use super::{ArithOp, CmpOp, Method, Mode, Node, NodeKind, Path, RegexPattern, Subscript};
use super::UNBOUNDED_LEVEL;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    filter_depth: u32,
    subscript_depth: u32,
}

pub fn parse(tokens: &[Token]) -> Result<Path> {
    let mut parser = Parser::new(tokens);
    let mode = parser.parse_mode();
    if parser.peek().is_none() {
        bail!("empty jsonpath expression");
    }
    let root = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        bail!("unexpected {tok:?} after end of jsonpath expression");
    }
    Ok(Path { mode, root })
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            filter_depth: 0,
            subscript_depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => bail!("expected {expected:?}, got {tok:?}"),
            None => bail!("expected {expected:?}, got end of input"),
        }
    }

    fn peek_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == word)
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if self.peek_ident(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_mode(&mut self) -> Mode {
        if self.eat_ident("strict") {
            Mode::Strict
        } else {
            self.eat_ident("lax");
            Mode::Lax
        }
    }

    // expr = and ("||" and)*
    fn parse_expr(&mut self) -> Result<Node> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = Node::new(NodeKind::Or(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    // and = not ("&&" not)*
    fn parse_and(&mut self) -> Result<Node> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.advance();
            let right = self.parse_not()?;
            left = Node::new(NodeKind::And(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    // not = "!" not | cmp ("is" "unknown")*
    fn parse_not(&mut self) -> Result<Node> {
        if self.peek() == Some(&Token::Bang) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Node::new(NodeKind::Not(Box::new(inner))));
        }
        let mut node = self.parse_cmp()?;
        while self.peek_ident("is") {
            self.advance();
            if !self.eat_ident("unknown") {
                bail!("expected 'unknown' after 'is' in jsonpath predicate");
            }
            node = Node::new(NodeKind::IsUnknown(Box::new(node)));
        }
        Ok(node)
    }

    // cmp = additive (op additive | starts with | like_regex)?
    fn parse_cmp(&mut self) -> Result<Node> {
        let left = self.parse_additive()?;

        let op = match self.peek() {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Node::new(NodeKind::Compare(
                op,
                Box::new(left),
                Box::new(right),
            )));
        }

        if self.peek_ident("starts") {
            self.advance();
            if !self.eat_ident("with") {
                bail!("expected 'with' after 'starts' in jsonpath predicate");
            }
            let right = self.parse_additive()?;
            return Ok(Node::new(NodeKind::StartsWith(
                Box::new(left),
                Box::new(right),
            )));
        }

        if self.peek_ident("like_regex") {
            self.advance();
            let pattern = match self.advance() {
                Some(Token::Str(s)) => s.clone(),
                other => bail!("expected string pattern after like_regex, got {other:?}"),
            };
            let flags = if self.peek_ident("flag") {
                self.advance();
                match self.advance() {
                    Some(Token::Str(s)) => s.clone(),
                    other => bail!("expected string after 'flag', got {other:?}"),
                }
            } else {
                String::new()
            };
            let re = compile_regex(&pattern, &flags)?;
            return Ok(Node::new(NodeKind::LikeRegex(
                Box::new(left),
                RegexPattern { pattern, flags, re },
            )));
        }

        Ok(left)
    }

    // additive = mul (("+"|"-") mul)*
    fn parse_additive(&mut self) -> Result<Node> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Node::new(NodeKind::Arith(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    // mul = unary (("*"|"/"|"%") unary)*
    fn parse_mul(&mut self) -> Result<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Node::new(NodeKind::Arith(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    // unary = ("+"|"-") unary | postfix
    fn parse_unary(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                let inner = self.parse_unary()?;
                Ok(Node::new(NodeKind::UnaryPlus(Box::new(inner))))
            }
            Some(Token::Minus) => {
                self.advance();
                let inner = self.parse_unary()?;
                Ok(Node::new(NodeKind::UnaryMinus(Box::new(inner))))
            }
            _ => self.parse_postfix(),
        }
    }

    // postfix = primary step*
    fn parse_postfix(&mut self) -> Result<Node> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let step = self.parse_dot_step()?;
                    node.append(step);
                }
                Some(Token::LBrack) => {
                    self.advance();
                    let step = self.parse_bracket_step()?;
                    node.append(step);
                }
                Some(Token::Question) => {
                    self.advance();
                    self.expect(&Token::LParen)?;
                    self.filter_depth += 1;
                    let pred = self.parse_expr();
                    self.filter_depth -= 1;
                    let pred = pred?;
                    self.expect(&Token::RParen)?;
                    node.append(Node::new(NodeKind::Filter(Box::new(pred))));
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// A step after `.`: wildcard, recursive descent, item method, or
    /// member key. Any keyword may serve as a key name.
    fn parse_dot_step(&mut self) -> Result<Node> {
        match self.advance() {
            Some(Token::Star) => Ok(Node::new(NodeKind::AnyKey)),
            Some(Token::StarStar) => self.parse_any_levels(),
            Some(Token::Str(name)) => Ok(Node::new(NodeKind::Key(name.clone()))),
            Some(Token::Ident(name)) => {
                let name = name.clone();
                if self.peek() == Some(&Token::LParen) {
                    self.parse_method(&name)
                } else {
                    Ok(Node::new(NodeKind::Key(name)))
                }
            }
            other => bail!("expected member name or wildcard after '.', got {other:?}"),
        }
    }

    // levels = "{" level ("to" level)? "}" | ε
    fn parse_any_levels(&mut self) -> Result<Node> {
        if self.peek() != Some(&Token::LBrace) {
            return Ok(Node::new(NodeKind::Any {
                first: 0,
                last: UNBOUNDED_LEVEL,
            }));
        }
        self.advance();
        let first = self.parse_level()?;
        let last = if self.eat_ident("to") {
            self.parse_level()?
        } else {
            first
        };
        self.expect(&Token::RBrace)?;
        if first != UNBOUNDED_LEVEL && last != UNBOUNDED_LEVEL && first > last {
            bail!("lower bound of ** range must not be greater than upper bound");
        }
        Ok(Node::new(NodeKind::Any { first, last }))
    }

    fn parse_level(&mut self) -> Result<u32> {
        match self.advance() {
            Some(Token::Int(n)) if *n >= 0 && *n < UNBOUNDED_LEVEL as i64 => Ok(*n as u32),
            Some(Token::Ident(s)) if s == "last" => Ok(UNBOUNDED_LEVEL),
            other => bail!("expected level number or 'last' in ** bounds, got {other:?}"),
        }
    }

    /// A step after `[`: `[*]` or a subscript list.
    fn parse_bracket_step(&mut self) -> Result<Node> {
        if self.peek() == Some(&Token::Star) {
            self.advance();
            self.expect(&Token::RBrack)?;
            return Ok(Node::new(NodeKind::AnyArray));
        }
        self.subscript_depth += 1;
        let result = self.parse_subscripts();
        self.subscript_depth -= 1;
        let subscripts = result?;
        self.expect(&Token::RBrack)?;
        Ok(Node::new(NodeKind::ArrayIndex(subscripts)))
    }

    fn parse_subscripts(&mut self) -> Result<Vec<Subscript>> {
        let mut subscripts = Vec::new();
        loop {
            let from = self.parse_expr()?;
            let to = if self.eat_ident("to") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            subscripts.push(Subscript { from, to });
            if self.peek() != Some(&Token::Comma) {
                break;
            }
            self.advance();
        }
        Ok(subscripts)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.advance() {
            Some(Token::Dollar) => Ok(Node::new(NodeKind::Root)),
            Some(Token::DollarVar(name)) => Ok(Node::new(NodeKind::Variable(name.clone()))),
            Some(Token::At) => {
                if self.filter_depth == 0 {
                    bail!("@ is not allowed in root expressions");
                }
                Ok(Node::new(NodeKind::Current))
            }
            Some(Token::Str(s)) => Ok(Node::new(NodeKind::String(s.clone()))),
            Some(Token::Int(n)) => Ok(Node::new(NodeKind::Int(*n))),
            Some(Token::Numeric(text)) => Ok(Node::new(NodeKind::Numeric(text.clone()))),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Node::new(NodeKind::Bool(true))),
                "false" => Ok(Node::new(NodeKind::Bool(false))),
                "null" => Ok(Node::new(NodeKind::Null)),
                "last" => {
                    if self.subscript_depth == 0 {
                        bail!("LAST is allowed only in array subscripts");
                    }
                    Ok(Node::new(NodeKind::Last))
                }
                "exists" => {
                    self.expect(&Token::LParen)?;
                    let inner = self.parse_expr()?;
                    self.expect(&Token::RParen)?;
                    Ok(Node::new(NodeKind::Exists(Box::new(inner))))
                }
                other => bail!("unexpected identifier '{other}' in jsonpath expression"),
            },
            other => bail!("unexpected {other:?} in jsonpath expression"),
        }
    }

    /// Item method call `.name(args)`. The name was already consumed.
    fn parse_method(&mut self, name: &str) -> Result<Node> {
        self.expect(&Token::LParen)?;
        let method = match name {
            "type" => self.no_args(Method::Type, name)?,
            "size" => self.no_args(Method::Size, name)?,
            "abs" => self.no_args(Method::Abs, name)?,
            "floor" => self.no_args(Method::Floor, name)?,
            "ceiling" => self.no_args(Method::Ceiling, name)?,
            "double" => self.no_args(Method::Double, name)?,
            "bigint" => self.no_args(Method::Bigint, name)?,
            "integer" => self.no_args(Method::Integer, name)?,
            "number" => self.no_args(Method::Number, name)?,
            "string" => self.no_args(Method::String, name)?,
            "boolean" => self.no_args(Method::Boolean, name)?,
            "keyvalue" => self.no_args(Method::KeyValue, name)?,
            "date" => self.no_args(Method::Date, name)?,
            "time" => Method::Time(self.opt_numeric_arg()?),
            "time_tz" => Method::TimeTz(self.opt_numeric_arg()?),
            "timestamp" => Method::Timestamp(self.opt_numeric_arg()?),
            "timestamp_tz" => Method::TimestampTz(self.opt_numeric_arg()?),
            "datetime" => {
                if self.peek() == Some(&Token::RParen) {
                    Method::Datetime(None)
                } else {
                    match self.advance() {
                        Some(Token::Str(template)) => Method::Datetime(Some(template.clone())),
                        other => bail!("expected string template in .datetime(), got {other:?}"),
                    }
                }
            }
            "decimal" => {
                let precision = self.opt_numeric_arg()?;
                let scale = if precision.is_some() && self.peek() == Some(&Token::Comma) {
                    self.advance();
                    self.opt_numeric_arg()?
                } else {
                    None
                };
                Method::Decimal { precision, scale }
            }
            other => bail!("unknown jsonpath item method: .{other}()"),
        };
        self.expect(&Token::RParen)?;
        Ok(Node::new(NodeKind::Method(method)))
    }

    fn no_args(&mut self, method: Method, name: &str) -> Result<Method> {
        if self.peek() != Some(&Token::RParen) {
            bail!("jsonpath item method .{name}() takes no arguments");
        }
        Ok(method)
    }

    /// Optional signed numeric-literal argument (`.time(2)`,
    /// `.decimal(10, -2)`). Kept as an AST node so range checks happen at
    /// execution time with the contractual error messages.
    fn opt_numeric_arg(&mut self) -> Result<Option<Box<Node>>> {
        if self.peek() == Some(&Token::RParen) {
            return Ok(None);
        }
        let negative = match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                true
            }
            Some(Token::Plus) => {
                self.advance();
                false
            }
            _ => false,
        };
        let node = match self.advance() {
            Some(Token::Int(n)) => {
                let n = *n;
                Node::new(NodeKind::Int(if negative { -n } else { n }))
            }
            Some(Token::Numeric(text)) => {
                let text = if negative {
                    format!("-{text}")
                } else {
                    text.clone()
                };
                Node::new(NodeKind::Numeric(text))
            }
            other => bail!("expected numeric literal argument, got {other:?}"),
        };
        Ok(Some(Box::new(node)))
    }
}

fn compile_regex(pattern: &str, flags: &str) -> Result<regex::Regex> {
    let mut case_insensitive = false;
    let mut multi_line = false;
    let mut dot_matches_new_line = false;
    let mut ignore_whitespace = false;
    let mut literal = false;
    for c in flags.chars() {
        match c {
            'i' => case_insensitive = true,
            'm' => multi_line = true,
            's' => dot_matches_new_line = true,
            'x' => ignore_whitespace = true,
            'q' => literal = true,
            _ => bail!("unrecognized flag character \"{c}\" in LIKE_REGEX predicate"),
        }
    }
    let source = if literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };
    regex::RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .multi_line(multi_line)
        .dot_matches_new_line(dot_matches_new_line)
        .ignore_whitespace(ignore_whitespace && !literal)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid regular expression: {e}"))
}

#[cfg(test)]
mod tests {
    use super::super::{lexer, Mode, NodeKind};
    use super::*;

    fn parse_str(input: &str) -> Result<Path> {
        parse(&lexer::lex(input)?)
    }

    #[test]
    fn parses_mode_prefix() {
        assert_eq!(parse_str("$.a").unwrap().mode, Mode::Lax);
        assert_eq!(parse_str("lax $.a").unwrap().mode, Mode::Lax);
        assert_eq!(parse_str("strict $.a").unwrap().mode, Mode::Strict);
    }

    #[test]
    fn parses_member_chain() {
        let path = parse_str("$.a.b").unwrap();
        assert!(matches!(path.root.kind, NodeKind::Root));
        let a = path.root.next.as_ref().unwrap();
        assert!(matches!(&a.kind, NodeKind::Key(k) if k == "a"));
        let b = a.next.as_ref().unwrap();
        assert!(matches!(&b.kind, NodeKind::Key(k) if k == "b"));
    }

    #[test]
    fn quoted_member_and_keyword_member() {
        let path = parse_str(r#"$."a b".to.last"#).unwrap();
        let step = path.root.next.as_ref().unwrap();
        assert!(matches!(&step.kind, NodeKind::Key(k) if k == "a b"));
        let to = step.next.as_ref().unwrap();
        assert!(matches!(&to.kind, NodeKind::Key(k) if k == "to"));
        let last = to.next.as_ref().unwrap();
        assert!(matches!(&last.kind, NodeKind::Key(k) if k == "last"));
    }

    #[test]
    fn parses_filter_with_current() {
        let path = parse_str("$[*] ? (@ < $v)").unwrap();
        let any = path.root.next.as_ref().unwrap();
        assert!(matches!(any.kind, NodeKind::AnyArray));
        let filter = any.next.as_ref().unwrap();
        assert!(matches!(filter.kind, NodeKind::Filter(_)));
    }

    #[test]
    fn rejects_current_outside_filter() {
        assert!(parse_str("@.a").is_err());
    }

    #[test]
    fn rejects_last_outside_subscript() {
        assert!(parse_str("$.a + last").is_err());
        assert!(parse_str("$[last]").is_ok());
        assert!(parse_str("$[1 to last]").is_ok());
    }

    #[test]
    fn parses_recursive_descent_bounds() {
        let path = parse_str("$.**{2 to last}").unwrap();
        let any = path.root.next.as_ref().unwrap();
        match any.kind {
            NodeKind::Any { first, last } => {
                assert_eq!(first, 2);
                assert_eq!(last, UNBOUNDED_LEVEL);
            }
            _ => panic!("expected Any, got {:?}", any.kind),
        }
        assert!(parse_str("$.**{3 to 2}").is_err());
    }

    #[test]
    fn parses_methods() {
        assert!(parse_str("$.x.size()").is_ok());
        assert!(parse_str("$.x.decimal(10, -2)").is_ok());
        assert!(parse_str("$.x.time(2)").is_ok());
        assert!(parse_str("$.x.datetime(\"HH24:MI\")").is_ok());
        assert!(parse_str("$.x.frobnicate()").is_err());
        assert!(parse_str("$.x.size(1)").is_err());
    }

    #[test]
    fn method_name_without_parens_is_a_key() {
        let path = parse_str("$.type").unwrap();
        let step = path.root.next.as_ref().unwrap();
        assert!(matches!(&step.kind, NodeKind::Key(k) if k == "type"));
    }

    #[test]
    fn parses_like_regex_flags() {
        let path = parse_str(r#"$.a ? (@ like_regex "^ab.*" flag "i")"#).unwrap();
        let filter = path.root.next.as_ref().unwrap().next.as_ref().unwrap();
        match &filter.kind {
            NodeKind::Filter(pred) => match &pred.kind {
                NodeKind::LikeRegex(_, re) => {
                    assert_eq!(re.flags, "i");
                    assert!(re.re.is_match("ABc"));
                }
                other => panic!("expected LikeRegex, got {other:?}"),
            },
            other => panic!("expected Filter, got {other:?}"),
        }
        assert!(parse_str(r#"$.a ? (@ like_regex "x" flag "z")"#).is_err());
    }

    #[test]
    fn literal_quote_flag_escapes_pattern() {
        let path = parse_str(r#"$ ? (@ like_regex "a.b" flag "q")"#).unwrap();
        match &path.root.next.as_ref().unwrap().kind {
            NodeKind::Filter(pred) => match &pred.kind {
                NodeKind::LikeRegex(_, re) => {
                    assert!(re.re.is_match("a.b"));
                    assert!(!re.re.is_match("axb"));
                }
                other => panic!("expected LikeRegex, got {other:?}"),
            },
            other => panic!("expected Filter, got {other:?}"),
        }
    }

    #[test]
    fn parses_arithmetic_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let path = parse_str("$[0 + 2 * 3]").unwrap();
        let index = path.root.next.as_ref().unwrap();
        match &index.kind {
            NodeKind::ArrayIndex(subs) => match &subs[0].from.kind {
                NodeKind::Arith(ArithOp::Add, _, right) => {
                    assert!(matches!(right.kind, NodeKind::Arith(ArithOp::Mul, _, _)));
                }
                other => panic!("expected Add, got {other:?}"),
            },
            other => panic!("expected ArrayIndex, got {other:?}"),
        }
    }

    #[test]
    fn parses_parenthesized_expression_with_method() {
        let path = parse_str("($.x + 1).abs()").unwrap();
        assert!(matches!(path.root.kind, NodeKind::Arith(ArithOp::Add, _, _)));
        let next = path.root.next.as_ref().unwrap();
        assert!(matches!(&next.kind, NodeKind::Method(m) if m.name() == "abs"));
    }

    #[test]
    fn parses_boolean_connectives() {
        let path = parse_str("$ ? (@.a == 1 && !(@.b > 2) || (@.c == 3) is unknown)").unwrap();
        match &path.root.next.as_ref().unwrap().kind {
            NodeKind::Filter(pred) => assert!(matches!(pred.kind, NodeKind::Or(_, _))),
            other => panic!("expected Filter, got {other:?}"),
        }
    }

    #[test]
    fn parses_exists_and_starts_with() {
        assert!(parse_str("$ ? (exists(@.a))").is_ok());
        assert!(parse_str(r#"$ ? (@.a starts with "ab")"#).is_ok());
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse_str("$.a $.b").is_err());
    }
}
