//! Result reconciler (verb module)
//!
//! Reads rows of an executed statement and re-serializes them into the
//! response shape the native engine produces.

mod process;
mod response;
mod value;

pub use process::ResultSetProcessor;
pub use response::{ResponseDocument, ResultRecord};
pub use value::CellValue;
