//! Aggregation query IR (noun module)
//!
//! The fully-resolved query handed to the SQL backend: grouping dimensions,
//! named aggregations, filter/having/post-aggregation trees, granularity,
//! intervals, sort and limit. Deserializes from the engine's JSON shape.

mod aggregation;
mod filter;
mod granularity;
mod having;
mod post_aggregation;
mod request;

pub use aggregation::{Aggregation, AggregationKind};
pub use filter::{Filter, SearchMode, SearchQuery};
pub use granularity::{Granularity, Interval};
pub use having::{ClauseOperator, ComparisonOp, Having};
pub use post_aggregation::{ArithmeticOp, Number, PostAggregation, SetOperation};
pub use request::{AggregationQuery, LimitSpec, OrderByColumn, QueryType, SortDirection};
