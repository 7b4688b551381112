#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};

use keyset::storage::memory::{MemoryQuery, MemoryRepository, MemoryTable, TableSchema};
use keyset::{FromRow, KeysetError, KeysetResult, Record, Row, Value};

/// Table of `(n, payload)` rows without a primary key, so `n` may repeat.
pub fn numbers(keys: &[i64]) -> MemoryTable {
    let schema = TableSchema::new("numbers", &[("n", "INTEGER"), ("payload", "TEXT")]).unwrap();
    let table = MemoryTable::new(schema);
    for (i, k) in keys.iter().enumerate() {
        table.insert(Row::new().with("n", *k).with("payload", format!("p{}", i))).unwrap();
    }
    table
}

pub fn spec(table: &MemoryTable) -> impl Fn() -> MemoryQuery + use<> {
    let table = table.clone();
    move || table.query()
}

pub fn n(row: &Row) -> i64 {
    row.get("n").and_then(Value::as_i64).unwrap()
}

pub fn payload(row: &Row) -> String {
    row.get("payload").and_then(Value::as_str).unwrap().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl FromRow for User {
    fn from_row(row: &Row) -> KeysetResult<Self> {
        let id = row
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| KeysetError::Materialize("id is not an integer".into()))?;
        let name = row
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| KeysetError::Materialize(format!("user {} has no name", id)))?
            .to_string();
        let created_at = match row.get("created_at") {
            Some(Value::Timestamp(ts)) => *ts,
            _ => return Err(KeysetError::Materialize(format!("user {} has no created_at", id))),
        };
        Ok(User { id, name, created_at })
    }
}

impl Record for User {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Integer(self.id)),
            "name" => Some(Value::Text(self.name.clone())),
            "created_at" => Some(Value::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

pub fn signup(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

/// Users 1..=count; later ids signed up earlier.
pub fn users(count: i64, with_primary_key: bool) -> MemoryTable {
    let mut schema =
        TableSchema::new("users", &[("id", "INT"), ("name", "TEXT"), ("created_at", "TIMESTAMP")]).unwrap();
    if with_primary_key {
        schema = schema.with_primary_key("id").unwrap();
    }
    let table = MemoryTable::new(schema);
    for id in 1..=count {
        table
            .insert(
                Row::new()
                    .with("id", id)
                    .with("name", format!("user{}", id))
                    .with("created_at", signup((30 - id) as u32)),
            )
            .unwrap();
    }
    table
}

pub fn repository(table: &MemoryTable) -> MemoryRepository<User> {
    MemoryRepository::new(table.clone())
}
