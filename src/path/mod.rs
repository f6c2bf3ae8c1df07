pub mod display;
pub mod exec;
pub mod lexer;
pub mod parser;

/// A parsed SQL/JSON path expression: the mode flag plus the root of the
/// node chain. Obtained from [`parse`] or [`str::parse`].
#[derive(Debug, Clone)]
pub struct Path {
    pub(crate) mode: Mode,
    pub(crate) root: Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lax,
    Strict,
}

impl Path {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_strict(&self) -> bool {
        self.mode == Mode::Strict
    }
}

impl std::str::FromStr for Path {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse a jsonpath expression string into a `Path`.
pub fn parse(input: &str) -> anyhow::Result<Path> {
    let tokens = lexer::lex(input)?;
    parser::parse(&tokens)
}

/// A jsonpath AST node. Accessor chains link through `next`: `$.a.b` is
/// `Root` → `Key("a")` → `Key("b")`. Expression nodes own their operands
/// and may still have a `next` (`($.x + 1).abs()`).
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub next: Option<Box<Node>>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node { kind, next: None }
    }

    /// Appends a node at the tail of the `next` chain.
    pub fn append(&mut self, node: Node) {
        let mut cur = self;
        while let Some(ref mut next) = cur.next {
            cur = next;
        }
        cur.next = Some(Box::new(node));
    }
}

/// Sentinel for an unbounded `**` level range.
pub const UNBOUNDED_LEVEL: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// `$`
    Root,
    /// `@` — the filter-local current item
    Current,
    /// `last` — only valid inside an array subscript
    Last,
    Null,
    Bool(bool),
    Int(i64),
    /// Decimal/exponent numeric literal, kept as written
    Numeric(String),
    String(String),
    /// `$name`
    Variable(String),
    /// `.name`
    Key(String),
    /// `.*`
    AnyKey,
    /// `[*]`
    AnyArray,
    /// `[s, s, …]`
    ArrayIndex(Vec<Subscript>),
    /// `.**` / `.**{first}` / `.**{first to last}`
    Any { first: u32, last: u32 },
    /// `? (predicate)`
    Filter(Box<Node>),
    /// `exists (expr)`
    Exists(Box<Node>),
    /// `!(predicate)`
    Not(Box<Node>),
    /// `(predicate) is unknown`
    IsUnknown(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare(CmpOp, Box<Node>, Box<Node>),
    Arith(ArithOp, Box<Node>, Box<Node>),
    UnaryPlus(Box<Node>),
    UnaryMinus(Box<Node>),
    /// `expr starts with expr`
    StartsWith(Box<Node>, Box<Node>),
    /// `expr like_regex "pattern" [flag "…"]`
    LikeRegex(Box<Node>, RegexPattern),
    /// `.type()`, `.size()`, … — item methods
    Method(Method),
}

/// One `[…]` subscript: an index, or an inclusive `from to to` range.
#[derive(Debug, Clone)]
pub struct Subscript {
    pub from: Node,
    pub to: Option<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Operator spelling, used in error messages and path rendering.
    pub fn name(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn name(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// A `like_regex` pattern, compiled once at parse time.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    pub pattern: String,
    pub flags: String,
    pub re: regex::Regex,
}

#[derive(Debug, Clone)]
pub enum Method {
    Type,
    Size,
    Abs,
    Floor,
    Ceiling,
    Double,
    Bigint,
    Integer,
    Number,
    /// `.decimal([precision [, scale]])` — arguments are numeric-literal
    /// nodes, validated at execution time
    Decimal {
        precision: Option<Box<Node>>,
        scale: Option<Box<Node>>,
    },
    String,
    Boolean,
    KeyValue,
    Date,
    /// `.time([precision])` and friends — precision is a numeric-literal
    /// node so out-of-range values surface as execution errors
    Time(Option<Box<Node>>),
    TimeTz(Option<Box<Node>>),
    Timestamp(Option<Box<Node>>),
    TimestampTz(Option<Box<Node>>),
    /// `.datetime()`; the template-string overload is reserved and
    /// rejected at execution time
    Datetime(Option<String>),
}

impl Method {
    /// Method name as written in a path, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Method::Type => "type",
            Method::Size => "size",
            Method::Abs => "abs",
            Method::Floor => "floor",
            Method::Ceiling => "ceiling",
            Method::Double => "double",
            Method::Bigint => "bigint",
            Method::Integer => "integer",
            Method::Number => "number",
            Method::Decimal { .. } => "decimal",
            Method::String => "string",
            Method::Boolean => "boolean",
            Method::KeyValue => "keyvalue",
            Method::Date => "date",
            Method::Time(_) => "time",
            Method::TimeTz(_) => "time_tz",
            Method::Timestamp(_) => "timestamp",
            Method::TimestampTz(_) => "timestamp_tz",
            Method::Datetime(_) => "datetime",
        }
    }
}
