//! Integration tests for post-aggregations
//!
//! Tests that engine-side (SQL) and client-side (direct) evaluation agree.

mod common;

use aggsql::{PostAggregationMode, ResponseDocument};
use common::{load_config, load_query, SalesFixture};
use serde_json::{json, Value};

async fn run(mode: PostAggregationMode) -> (String, ResponseDocument) {
    let mut config = load_config("sales.yaml");
    config.post_aggregations = mode;
    let fixture = SalesFixture::with_config(config).await;
    let query = load_query("click_ratio.json");

    let sql = fixture.client.prepare(&query).expect("Query should compile").sql().to_string();
    let response = fixture.client.execute(&query).await.expect("Query should run");
    (sql, response)
}

fn field<'a>(response: &'a ResponseDocument, region: Value, name: &str) -> &'a Value {
    response
        .records()
        .iter()
        .find(|r| r.get("region") == Some(&region))
        .and_then(|r| r.get(name))
        .unwrap_or_else(|| panic!("no {} for region {}", name, region))
}

#[tokio::test]
async fn test_sql_mode_wraps_aggregate_subquery() {
    let (sql, _) = run(PostAggregationMode::Sql).await;
    assert!(sql.starts_with("SELECT \"agg\".*, CASE WHEN"), "{}", sql);
    assert!(sql.contains(") AS \"agg\"\nORDER BY"), "{}", sql);
}

#[tokio::test]
async fn test_direct_mode_leaves_statement_unwrapped() {
    let (sql, response) = run(PostAggregationMode::Direct).await;
    assert!(!sql.contains("\"agg\""), "{}", sql);
    assert_eq!(field(&response, json!("US"), "pct"), &json!(8.0 / 60.0));
}

#[tokio::test]
async fn test_modes_agree() {
    let (_, sql_mode) = run(PostAggregationMode::Sql).await;
    let (_, direct_mode) = run(PostAggregationMode::Direct).await;
    assert_eq!(sql_mode.len(), 5);
    assert_eq!(sql_mode.to_json(), direct_mode.to_json());
}

#[tokio::test]
async fn test_divide_by_zero_is_zero() {
    for mode in [PostAggregationMode::Sql, PostAggregationMode::Direct] {
        let (_, response) = run(mode).await;
        // MX: 0 / 0, FR: 6 / 0
        assert_eq!(field(&response, json!("MX"), "pct"), &json!(0.0), "{:?}", mode);
        assert_eq!(field(&response, json!("FR"), "pct"), &json!(0.0), "{:?}", mode);
        assert_eq!(field(&response, json!(null), "pct"), &json!(0.2), "{:?}", mode);
    }
}

#[tokio::test]
async fn test_integer_arithmetic_stays_integral() {
    for mode in [PostAggregationMode::Sql, PostAggregationMode::Direct] {
        let (_, response) = run(mode).await;
        // impressions - clicks - 1
        assert_eq!(field(&response, json!("US"), "spread"), &json!(51), "{:?}", mode);
        assert_eq!(field(&response, json!("MX"), "spread"), &json!(-1), "{:?}", mode);
    }
}

#[tokio::test]
async fn test_sort_on_post_aggregation() {
    let mut config = load_config("sales.yaml");
    config.post_aggregations = PostAggregationMode::Sql;
    let fixture = SalesFixture::with_config(config).await;
    let mut query = load_query("click_ratio.json");
    query.limit_spec = Some(serde_json::from_value(json!({
        "limit": 2,
        "columns": [{"dimension": "pct", "direction": "descending"}]
    })).unwrap());

    let response = fixture.client.execute(&query).await.expect("Query should run");
    let regions: Vec<_> = response.records().iter().filter_map(|r| r.get("region").cloned()).collect();
    // null region: 1/5, US: 8/60
    assert_eq!(regions, vec![json!(null), json!("US")]);
}

#[tokio::test]
async fn test_direct_mode_cannot_sort_on_post_aggregation() {
    let mut config = load_config("sales.yaml");
    config.post_aggregations = PostAggregationMode::Direct;
    let fixture = SalesFixture::with_config(config).await;
    let mut query = load_query("click_ratio.json");
    query.limit_spec = Some(serde_json::from_value(json!({
        "columns": [{"dimension": "pct", "direction": "descending"}]
    })).unwrap());

    let err = fixture.client.prepare(&query).unwrap_err();
    assert_eq!(err.kind(), aggsql::ErrorKind::UnsupportedConstruct);
}

#[tokio::test]
async fn test_field_access_outside_aggregations_fails_in_both_modes() {
    for mode in [PostAggregationMode::Sql, PostAggregationMode::Direct] {
        let mut config = load_config("sales.yaml");
        config.post_aggregations = mode;
        let fixture = SalesFixture::with_config(config).await;

        // a grouped dimension, then a mapped column nothing aggregates
        for field_name in ["region", "amount"] {
            let mut query = load_query("click_ratio.json");
            query.post_aggregations.push(serde_json::from_value(json!({
                "type": "arithmetic",
                "name": "scaled",
                "fn": "*",
                "fields": [
                    {"type": "fieldAccess", "fieldName": field_name},
                    {"type": "constant", "name": "two", "value": 2}
                ]
            })).unwrap());

            let err = fixture.client.prepare(&query).unwrap_err();
            assert_eq!(err.kind(), aggsql::ErrorKind::UnknownField, "{:?} {}", mode, field_name);
            let err = fixture.client.execute(&query).await.unwrap_err();
            assert_eq!(err.kind(), aggsql::ErrorKind::UnknownField, "{:?} {}", mode, field_name);
        }
    }
}
