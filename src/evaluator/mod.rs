//! Expression evaluators (verb module)
//!
//! Filter, having and post-aggregation trees compiled into relational
//! expressions. Each evaluator is an exhaustive match over its tree's closed
//! variant set; constructs without a translation are rejected, never
//! approximated.

mod filter;
mod having;
mod post_aggregation;

pub use filter::FilterEvaluator;
pub use having::HavingEvaluator;
pub use post_aggregation::{parse_number, PostAggregationEvaluator};
