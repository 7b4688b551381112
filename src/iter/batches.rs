use std::mem;

use log::{debug, trace};

use crate::error::{KeysetError, KeysetResult};
use crate::options::IterateOptions;
use crate::query::{Query, QuerySpec, Record};
use crate::storage::row::Value;

/// Last key seen by the loop, and whether its row has already been yielded.
#[derive(Debug, Clone)]
struct Watermark {
    value: Value,
    delivered: bool,
}

enum State {
    Start,
    Paging,
    Done,
}

/// Lazy sequence of batches produced by keyset iteration.
///
/// Every page re-issues the query with an inclusive `>=`/`<=` filter on the
/// iteration key and fetches one row more than the batch size. The extra row
/// becomes the watermark of the next page without being yielded, which tells
/// "exactly a batch left" apart from "more rows remain" without counting.
///
/// When a page has no lookahead row, its last row has been yielded already.
/// The next page drops leading rows that carry that key. Paging continues
/// while a page fetches at least a batch worth of rows, and stops once one
/// comes back short.
///
/// The iterator is fused: after it returns `None` or an error it never
/// queries again.
pub struct Batches<S: QuerySpec, T> {
    spec: S,
    options: IterateOptions<S::Query, T>,
    state: State,
    watermark: Option<Watermark>,
    pages: usize,
}

/// Iterates the rows described by `spec` in batches of `options.batch_size`.
///
/// Options are validated here, before any query is built. Nothing is executed
/// until the first call to `next()`.
pub fn iterate_select_query<S, T>(spec: S, options: IterateOptions<S::Query, T>) -> KeysetResult<Batches<S, T>>
where
    S: QuerySpec,
    T: Record,
{
    options.validate()?;
    debug!(
        "keyset iteration on '{}' {} in batches of {}",
        options.iteration_key,
        options.order.as_str(),
        options.batch_size
    );
    Ok(Batches {
        spec,
        options,
        state: State::Start,
        watermark: None,
        pages: 0,
    })
}

fn key_value<T: Record>(row: &T, key: &str) -> KeysetResult<Value> {
    row.field(key).ok_or_else(|| KeysetError::MissingKeyValue(key.to_string()))
}

impl<S: QuerySpec, T: Record> Batches<S, T> {
    /// Number of page queries executed so far, not counting the initial count.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Key value the next page will start from.
    pub fn watermark(&self) -> Option<&Value> {
        self.watermark.as_ref().map(|wm| &wm.value)
    }

    fn count_rows(&self) -> KeysetResult<u64> {
        self.spec.new_query().count()
    }

    /// Fetches one page. `Ok(None)` means the iteration is over.
    fn fetch_page(&mut self) -> KeysetResult<Option<Vec<T>>> {
        let key = self.options.iteration_key.as_str();
        let batch_size = self.options.batch_size;
        let order = self.options.order;

        let mut query = self.spec.new_query();
        if let Some(wm) = &self.watermark {
            trace!("filter {} {} {}", key, order.continuation(), wm.value);
            query.filter(key, order.continuation(), wm.value.clone())?;
        }
        query.order_by(key, order)?;
        query.limit(batch_size + 1);

        let mut rows = (self.options.extractor)(query)?;
        self.pages += 1;
        let fetched = rows.len();

        let previous = self.watermark.take();
        if let Some(wm) = previous.as_ref().filter(|wm| wm.delivered) {
            let mut seen = 0;
            for row in &rows {
                if key_value(row, key)? != wm.value {
                    break;
                }
                seen += 1;
            }
            rows.drain(..seen);
        }

        let Some(last) = rows.last() else {
            debug!("page {}: fetched {} rows, nothing new", self.pages, fetched);
            // A full page made only of already yielded rows would repeat forever.
            if fetched > batch_size {
                if let Some(wm) = previous {
                    return Err(KeysetError::Stalled { key: key.to_string(), value: wm.value });
                }
            }
            return Ok(None);
        };
        let last = key_value(last, key)?;
        let fresh = rows.len();
        debug!("page {}: fetched {} rows, {} new, watermark {}", self.pages, fetched, fresh, last);

        if fresh > batch_size {
            if previous.is_some_and(|wm| !wm.delivered && wm.value == last) {
                return Err(KeysetError::Stalled { key: key.to_string(), value: last });
            }
            rows.truncate(batch_size);
        }
        // The last fetched row is yielded unless it was the lookahead row.
        self.watermark = Some(Watermark { value: last, delivered: fresh <= batch_size });
        if fetched < batch_size {
            self.state = State::Done;
        }
        Ok(Some(rows))
    }
}

impl<S: QuerySpec, T: Record> Iterator for Batches<S, T> {
    type Item = KeysetResult<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.state, State::Paging) {
            State::Done => {
                self.state = State::Done;
                return None;
            }
            State::Start => match self.count_rows() {
                Ok(0) => {
                    debug!("query matches no rows, skipping iteration");
                    self.state = State::Done;
                    return None;
                }
                Ok(total) => debug!("query matches {} rows", total),
                Err(err) => {
                    self.state = State::Done;
                    return Some(Err(err));
                }
            },
            State::Paging => {}
        }

        match self.fetch_page() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.state = State::Done;
                None
            }
            Err(err) => {
                self.state = State::Done;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Order;
    use crate::storage::memory::{MemoryTable, TableSchema};
    use crate::storage::row::Row;

    fn table(keys: &[i64]) -> MemoryTable {
        let schema = TableSchema::new("nums", &[("n", "INTEGER"), ("label", "TEXT")]).unwrap();
        let table = MemoryTable::new(schema);
        for k in keys {
            table.insert(Row::new().with("n", *k).with("label", format!("row{}", k))).unwrap();
        }
        table
    }

    fn keys(batch: &[Row]) -> Vec<i64> {
        batch.iter().map(|r| r.get("n").and_then(Value::as_i64).unwrap()).collect()
    }

    #[test]
    fn lookahead_row_becomes_next_watermark() {
        let t = table(&[1, 2, 3, 4, 5]);
        let spec = {
            let t = t.clone();
            move || t.query()
        };
        let mut it = iterate_select_query(spec, IterateOptions::new(2, "n")).unwrap();
        assert_eq!(it.watermark(), None);
        assert_eq!(keys(&it.next().unwrap().unwrap()), vec![1, 2]);
        assert_eq!(it.watermark(), Some(&Value::Integer(3)));
        assert_eq!(keys(&it.next().unwrap().unwrap()), vec![3, 4]);
        assert_eq!(it.watermark(), Some(&Value::Integer(5)));
        assert_eq!(keys(&it.next().unwrap().unwrap()), vec![5]);
        assert!(it.next().is_none());
        assert_eq!(it.pages_fetched(), 3);
        assert_eq!(t.stats().counts, 1);
    }

    #[test]
    fn nothing_runs_before_first_pull() {
        let t = table(&[1, 2]);
        let spec = {
            let t = t.clone();
            move || t.query()
        };
        let it = iterate_select_query(spec, IterateOptions::new(1, "n").order(Order::Desc)).unwrap();
        drop(it);
        assert_eq!(t.stats().counts, 0);
        assert_eq!(t.stats().fetches, 0);
    }

    #[test]
    fn iterator_is_fused_after_end() {
        let t = table(&[1]);
        let spec = {
            let t = t.clone();
            move || t.query()
        };
        let mut it = iterate_select_query(spec, IterateOptions::new(5, "n")).unwrap();
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
        assert_eq!(t.stats().fetches, 1);
    }
}
