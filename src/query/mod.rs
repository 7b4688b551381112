//! Interfaces of the query source the iterator pages through.
//!
//! The iterator never executes anything itself: it asks a [`QuerySpec`] for a
//! fresh [`Query`] on every page, narrows it with a filter, an ordering and a
//! limit, and hands it to an extractor.

use std::fmt;

use crate::error::KeysetResult;
use crate::storage::row::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEquals,
    LessThan,
    LessOrEquals,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "!=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterOrEquals => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessOrEquals => "<=",
        }
    }

    /// Evaluates `left <op> right`.
    pub fn matches(&self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Equals => left == right,
            CompareOp::NotEquals => left != right,
            CompareOp::GreaterThan => left > right,
            CompareOp::GreaterOrEquals => left >= right,
            CompareOp::LessThan => left < right,
            CompareOp::LessOrEquals => left <= right,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    /// Operator that keeps rows at or past the watermark in this direction.
    pub fn continuation(&self) -> CompareOp {
        match self {
            Order::Asc => CompareOp::GreaterOrEquals,
            Order::Desc => CompareOp::LessOrEquals,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" | "ASCENDING" => Some(Order::Asc),
            "DESC" | "DESCENDING" => Some(Order::Desc),
            _ => None,
        }
    }
}

/// A single query under construction. Each page owns its own instance.
pub trait Query {
    /// Adds a `field <op> value` predicate, AND-ed with existing ones.
    fn filter(&mut self, field: &str, op: CompareOp, value: Value) -> KeysetResult<()>;

    /// Appends an ordering; earlier orderings take precedence.
    fn order_by(&mut self, field: &str, order: Order) -> KeysetResult<()>;

    fn limit(&mut self, n: usize);

    /// Number of rows matching the filters, ignoring any limit.
    fn count(&self) -> KeysetResult<u64>;

    /// Executes the query and returns plain rows.
    fn fetch_raw(self) -> KeysetResult<Vec<Row>>;
}

/// A re-enterable description of a query.
pub trait QuerySpec {
    type Query: Query;

    /// Builds an independent query. Two calls never share mutable state.
    fn new_query(&self) -> Self::Query;
}

impl<Q, F> QuerySpec for F
where
    Q: Query,
    F: Fn() -> Q,
{
    type Query = Q;

    fn new_query(&self) -> Q {
        self()
    }
}

/// Anything the iterator can read a watermark from.
pub trait Record {
    fn field(&self, name: &str) -> Option<Value>;
}

impl Record for Row {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Turns an executed query into results.
pub type Extractor<Q, T> = Box<dyn Fn(Q) -> KeysetResult<Vec<T>>>;
