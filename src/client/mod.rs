//! Execution client (verb module)
//!
//! Compiles a query, runs it on a pooled connection and streams the rows
//! through the reconciler.

mod handle;
mod row;
mod sql_backed;

pub use handle::QueryHandle;
pub use sql_backed::{PreparedQuery, SqlBackedClient};
