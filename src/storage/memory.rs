//! In-memory query source.
//!
//! Rows live in a shared vector; every query is evaluated with a full scan.
//! Tables count the queries run against them and can be told to fail a
//! given fetch, which makes them useful for exercising the iterator.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::rc::Rc;

use log::{debug, warn};

use crate::entity::{EntitySource, FromRow};
use crate::error::{KeysetError, KeysetResult};
use crate::query::{CompareOp, Order, Query, Record};
use crate::storage::row::{ColumnType, Row, Value, build_row};

/// Metadata of a memory table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<(String, ColumnType)>, // column names and types, in order
    pub primary_key: Option<String>,
}

impl TableSchema {
    /// Builds a schema from `(name, type)` pairs, e.g. `("id", "INTEGER")`.
    pub fn new(name: &str, columns: &[(&str, &str)]) -> KeysetResult<Self> {
        let mut cols = Vec::with_capacity(columns.len());
        for (col, ty) in columns {
            let ty = ColumnType::from_str(ty)
                .ok_or_else(|| KeysetError::InvalidSchema(format!("unknown type '{}' for column '{}'", ty, col)))?;
            if cols.iter().any(|(c, _): &(String, ColumnType)| c == col) {
                return Err(KeysetError::InvalidSchema(format!("duplicate column '{}'", col)));
            }
            cols.push((col.to_string(), ty));
        }
        Ok(TableSchema {
            name: name.to_string(),
            columns: cols,
            primary_key: None,
        })
    }

    pub fn with_primary_key(mut self, column: &str) -> KeysetResult<Self> {
        if !self.has_column(column) {
            return Err(KeysetError::ColumnNotFound(column.to_string()));
        }
        self.primary_key = Some(column.to_string());
        Ok(self)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|(c, _)| c == column)
    }
}

/// Number of queries executed against a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub counts: usize,
    pub fetches: usize,
}

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Row>,
    stats: QueryStats,
    fail_on_fetch: Option<usize>,
}

/// A table shared between the handle and every query built from it.
/// Cloning the handle shares the rows.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    schema: Rc<TableSchema>,
    state: Rc<RefCell<TableState>>,
}

impl MemoryTable {
    pub fn new(schema: TableSchema) -> Self {
        MemoryTable {
            schema: Rc::new(schema),
            state: Rc::new(RefCell::new(TableState::default())),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Inserts a row. Missing columns are stored as NULL.
    pub fn insert(&self, row: Row) -> KeysetResult<()> {
        if let Some(col) = row.columns().find(|c| !self.schema.has_column(c)) {
            return Err(KeysetError::ColumnNotFound(col.to_string()));
        }
        let mut full = Row::new();
        for (col, _) in &self.schema.columns {
            full.set(col, row.get(col).cloned().unwrap_or(Value::Null));
        }

        let mut state = self.state.borrow_mut();
        if let Some(pk) = &self.schema.primary_key {
            let key = full.get(pk).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                return Err(KeysetError::InvalidSchema(format!(
                    "null value in column '{}' violates primary key of '{}'",
                    pk, self.schema.name
                )));
            }
            if state.rows.iter().any(|r| r.get(pk) == Some(&key)) {
                return Err(KeysetError::DuplicateKey(key));
            }
        }
        state.rows.push(full);
        Ok(())
    }

    /// Inserts a row given as strings, one per column in schema order.
    pub fn insert_values(&self, values: &[String]) -> KeysetResult<()> {
        let row = build_row(values, &self.schema.columns)?;
        self.insert(row)
    }

    /// Deletes every row where `field <op> value`, returning how many went.
    pub fn delete_where(&self, field: &str, op: CompareOp, value: &Value) -> KeysetResult<usize> {
        if !self.schema.has_column(field) {
            return Err(KeysetError::ColumnNotFound(field.to_string()));
        }
        let mut state = self.state.borrow_mut();
        let before = state.rows.len();
        state
            .rows
            .retain(|r| !op.matches(r.get(field).unwrap_or(&Value::Null), value));
        Ok(before - state.rows.len())
    }

    pub fn len(&self) -> usize {
        self.state.borrow().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a fresh, unfiltered query.
    pub fn query(&self) -> MemoryQuery {
        MemoryQuery {
            table: self.clone(),
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
        }
    }

    pub fn stats(&self) -> QueryStats {
        self.state.borrow().stats
    }

    pub fn reset_stats(&self) {
        self.state.borrow_mut().stats = QueryStats::default();
    }

    /// Makes the `n`-th fetch from now fail, counting from 1.
    pub fn fail_on_fetch(&self, n: usize) {
        let mut state = self.state.borrow_mut();
        state.fail_on_fetch = Some(state.stats.fetches + n);
    }
}

/// A query against a [`MemoryTable`]. Filters are AND-ed together.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    table: MemoryTable,
    filters: Vec<(String, CompareOp, Value)>,
    orders: Vec<(String, Order)>,
    limit: Option<usize>,
}

impl MemoryQuery {
    fn check_column(&self, field: &str) -> KeysetResult<()> {
        if self.table.schema.has_column(field) {
            Ok(())
        } else {
            Err(KeysetError::ColumnNotFound(field.to_string()))
        }
    }

    fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(field, op, value)| op.matches(row.get(field).unwrap_or(&Value::Null), value))
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for (field, order) in &self.orders {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ord = match order {
                Order::Asc => left.cmp(right),
                Order::Desc => right.cmp(left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Query for MemoryQuery {
    fn filter(&mut self, field: &str, op: CompareOp, value: Value) -> KeysetResult<()> {
        self.check_column(field)?;
        self.filters.push((field.to_string(), op, value));
        Ok(())
    }

    fn order_by(&mut self, field: &str, order: Order) -> KeysetResult<()> {
        self.check_column(field)?;
        self.orders.push((field.to_string(), order));
        Ok(())
    }

    fn limit(&mut self, n: usize) {
        self.limit = Some(n);
    }

    fn count(&self) -> KeysetResult<u64> {
        let mut state = self.table.state.borrow_mut();
        state.stats.counts += 1;
        let total = state.rows.iter().filter(|r| self.matches(r)).count();
        Ok(total as u64)
    }

    fn fetch_raw(self) -> KeysetResult<Vec<Row>> {
        let mut rows = {
            let mut state = self.table.state.borrow_mut();
            state.stats.fetches += 1;
            if state.fail_on_fetch == Some(state.stats.fetches) {
                state.fail_on_fetch = None;
                warn!("failing fetch {} on '{}'", state.stats.fetches, self.table.schema.name);
                return Err(KeysetError::QueryMessage(format!(
                    "connection lost while reading '{}'",
                    self.table.schema.name
                )));
            }
            state
                .rows
                .iter()
                .filter(|r| self.matches(r))
                .cloned()
                .collect::<Vec<_>>()
        };
        rows.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        debug!(
            "fetched {} rows from '{}' ({} filters, limit {:?})",
            rows.len(),
            self.table.schema.name,
            self.filters.len(),
            self.limit
        );
        Ok(rows)
    }
}

/// Typed access to a memory table, keyed by its declared primary key.
pub struct MemoryRepository<E> {
    table: MemoryTable,
    _entity: PhantomData<fn() -> E>,
}

impl<E> MemoryRepository<E> {
    pub fn new(table: MemoryTable) -> Self {
        MemoryRepository { table, _entity: PhantomData }
    }

    pub fn table(&self) -> &MemoryTable {
        &self.table
    }
}

impl<E> Clone for MemoryRepository<E> {
    fn clone(&self) -> Self {
        MemoryRepository::new(self.table.clone())
    }
}

impl<E: FromRow + Record> EntitySource for MemoryRepository<E> {
    type Entity = E;
    type Query = MemoryQuery;

    fn primary_key(&self) -> Option<&str> {
        self.table.schema.primary_key.as_deref()
    }

    fn create_query(&self) -> MemoryQuery {
        self.table.query()
    }

    fn materialize(&self, query: MemoryQuery) -> KeysetResult<Vec<E>> {
        query.fetch_raw()?.iter().map(E::from_row).collect()
    }
}
