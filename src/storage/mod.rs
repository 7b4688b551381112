pub mod memory;
pub mod row;
