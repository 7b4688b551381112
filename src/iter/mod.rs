pub mod batches;
pub mod items;

pub use batches::{Batches, iterate_select_query};
pub use items::{BatchesExt, Items, iterate_query_items};
