//! Physical table descriptions (noun module)
//!
//! A `TableSchema` names the physical relation behind a logical table, its
//! timestamp column and the logical-to-physical column mapping.

mod column;
mod table;

pub use column::ColumnMapping;
pub use table::TableSchema;
