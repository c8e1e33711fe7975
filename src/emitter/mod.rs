//! SQL emitter (verb module)
//!
//! Renders a SelectStatement into dialect-specific SQL text.

mod sql;

pub use sql::{emit_sql, SqlEmitter};
