//! qpath — a PostgreSQL-compatible SQL/JSON path engine.
//!
//! Parse a path once, then evaluate it against decoded JSON values in one
//! of four modes: `query` (all selected items), `first`, `exists`, and
//! `matches` (ternary predicate).
//!
//! ```
//! use qpath::{QueryOptions, Value};
//!
//! let path = qpath::parse("$.a[*] ? (@ > 1)").unwrap();
//! let doc = Value::from(serde_json::json!({"a": [1, 2, 3]}));
//! let items = path.query(&doc, &QueryOptions::new()).unwrap();
//! assert_eq!(items, vec![Value::Int(2), Value::Int(3)]);
//! ```

pub mod datetime;
pub mod error;
pub mod output;
pub mod path;
pub mod value;

pub use datetime::Datetime;
pub use error::Error;
pub use path::exec::QueryOptions;
pub use path::{Mode, Path, parse};
pub use value::Value;
