use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{KeysetError, KeysetResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
    Char(usize),
    Timestamp,
}

impl ColumnType {
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.to_uppercase();
        if upper.starts_with("CHAR") {
            if let Some(start) = s.find('(') {
                if let Some(end) = s.find(')') {
                    if let Ok(sz) = s[start + 1..end].parse::<usize>() {
                        return Some(ColumnType::Char(sz));
                    }
                }
            }
            return Some(ColumnType::Char(1));
        }
        match upper.as_str() {
            "INTEGER" | "INT" | "BIGINT" => Some(ColumnType::Integer),
            "TEXT" => Some(ColumnType::Text),
            "BOOLEAN" | "BOOL" => Some(ColumnType::Boolean),
            "TIMESTAMP" | "DATETIME" => Some(ColumnType::Timestamp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".into(),
            ColumnType::Text => "TEXT".into(),
            ColumnType::Boolean => "BOOLEAN".into(),
            ColumnType::Char(size) => format!("CHAR({})", size),
            ColumnType::Timestamp => "TIMESTAMP".into(),
        }
    }
}

/// A single field value. Values of different variants never compare equal;
/// they order by variant first so that any column forms a total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Timestamp(NaiveDateTime),
    Text(String),
    Char(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Text(_) => 4,
            Value::Char(_) => 5,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Char(s) => Some(s),
            _ => None,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) | (Value::Char(a), Value::Char(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Char(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

/// A row of named fields, as returned by a raw fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Row { fields: Vec::new() }
    }

    /// Appends a field, replacing an existing one with the same name.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Build a `Row` from raw string values according to the declared column
/// types. Returns an error if any value cannot be converted or the counts do
/// not match.
pub fn build_row(values: &[String], columns: &[(String, ColumnType)]) -> KeysetResult<Row> {
    if values.len() != columns.len() {
        return Err(KeysetError::Materialize(format!(
            "expected {} values, got {}",
            columns.len(),
            values.len()
        )));
    }
    let mut row = Row::new();
    for (v, (name, ty)) in values.iter().zip(columns.iter()) {
        if v.eq_ignore_ascii_case("null") {
            row.set(name, Value::Null);
            continue;
        }
        let value = match ty {
            ColumnType::Integer => v.parse::<i64>().map(Value::Integer).map_err(|_| {
                KeysetError::Materialize(format!("value '{}' for column '{}' is not a valid INTEGER", v, name))
            })?,
            ColumnType::Text => Value::Text(v.clone()),
            ColumnType::Boolean => match v.to_ascii_lowercase().as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => {
                    return Err(KeysetError::Materialize(format!(
                        "value '{}' for column '{}' is not a valid BOOLEAN",
                        v, name
                    )));
                }
            },
            ColumnType::Char(len) => {
                let mut s = v.clone();
                if s.len() > *len {
                    s.truncate(*len);
                } else if s.len() < *len {
                    s.push_str(&" ".repeat(*len - s.len()));
                }
                Value::Char(s)
            }
            ColumnType::Timestamp => NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S")
                .map(Value::Timestamp)
                .map_err(|_| {
                    KeysetError::Materialize(format!("value '{}' for column '{}' is not a valid TIMESTAMP", v, name))
                })?,
        };
        row.set(name, value);
    }
    Ok(row)
}
