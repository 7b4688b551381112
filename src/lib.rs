pub mod entity;
pub mod error;
pub mod iter;
pub mod options;
pub mod query;
pub mod storage;

pub use entity::{EntitySource, FromRow, QueryFactory, iterate_repository, iterate_repository_entities};
pub use error::{KeysetError, KeysetResult};
pub use iter::{Batches, BatchesExt, Items, iterate_query_items, iterate_select_query};
pub use options::{IterateOptions, RepositoryOptions};
pub use query::{CompareOp, Extractor, Order, Query, QuerySpec, Record};
pub use storage::row::{ColumnType, Row, Value};
