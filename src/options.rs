use std::fmt;

use crate::error::{KeysetError, KeysetResult};
use crate::query::{Extractor, Order, Query};
use crate::storage::row::Row;

/// Options for [`iterate_select_query`](crate::iter::iterate_select_query).
pub struct IterateOptions<Q, T> {
    pub batch_size: usize,
    pub iteration_key: String,
    pub order: Order,
    pub(crate) extractor: Extractor<Q, T>,
}

impl<Q: Query + 'static> IterateOptions<Q, Row> {
    /// Options that fetch raw rows, in ascending order.
    pub fn new(batch_size: usize, iteration_key: impl Into<String>) -> Self {
        IterateOptions {
            batch_size,
            iteration_key: iteration_key.into(),
            order: Order::Asc,
            extractor: Box::new(|query: Q| query.fetch_raw()),
        }
    }
}

impl<Q, T> IterateOptions<Q, T> {
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Replaces the extractor, which may change the item type.
    pub fn extractor<U, F>(self, extractor: F) -> IterateOptions<Q, U>
    where
        F: Fn(Q) -> KeysetResult<Vec<U>> + 'static,
    {
        IterateOptions {
            batch_size: self.batch_size,
            iteration_key: self.iteration_key,
            order: self.order,
            extractor: Box::new(extractor),
        }
    }

    pub fn validate(&self) -> KeysetResult<()> {
        if self.batch_size == 0 {
            return Err(KeysetError::InvalidBatchSize(self.batch_size));
        }
        if self.iteration_key.trim().is_empty() {
            return Err(KeysetError::MissingIterationKey);
        }
        Ok(())
    }
}

impl<Q, T> fmt::Debug for IterateOptions<Q, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterateOptions")
            .field("batch_size", &self.batch_size)
            .field("iteration_key", &self.iteration_key)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Options for iterating an entity source. The key defaults to the source's
/// primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryOptions {
    pub batch_size: usize,
    pub id_key: Option<String>,
    pub order: Order,
}

impl RepositoryOptions {
    pub fn new(batch_size: usize) -> Self {
        RepositoryOptions { batch_size, id_key: None, order: Order::Asc }
    }

    pub fn id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = Some(key.into());
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryQuery;

    #[test]
    fn zero_batch_size_is_rejected() {
        let opts = IterateOptions::<MemoryQuery, Row>::new(0, "id");
        assert!(matches!(opts.validate(), Err(KeysetError::InvalidBatchSize(0))));
    }

    #[test]
    fn blank_key_is_rejected() {
        let opts = IterateOptions::<MemoryQuery, Row>::new(10, "  ");
        assert!(matches!(opts.validate(), Err(KeysetError::MissingIterationKey)));
    }

    #[test]
    fn builder_keeps_settings_across_extractor_swap() {
        let opts = IterateOptions::<MemoryQuery, Row>::new(5, "id")
            .order(Order::Desc)
            .extractor(|q: MemoryQuery| Ok(q.fetch_raw()?.iter().map(Row::len).collect::<Vec<_>>()));
        assert_eq!(opts.batch_size, 5);
        assert_eq!(opts.order, Order::Desc);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn repository_options_default_to_ascending_without_key() {
        let opts = RepositoryOptions::new(3);
        assert_eq!(opts.id_key, None);
        assert_eq!(opts.order, Order::Asc);
        assert_eq!(opts.id_key("uuid").id_key.as_deref(), Some("uuid"));
    }
}
