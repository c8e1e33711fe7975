//! Shared test utilities for integration tests

#![allow(dead_code)]

use aggsql::{parser, AggregationQuery, SqlBackedClient, SqlBackendConfig};
use tempfile::TempDir;

/// Load a backend config from the tests/test_data directory
pub fn load_config(name: &str) -> SqlBackendConfig {
    let path = format!("tests/test_data/{}", name);
    parser::parse_config_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load test config {}: {}", name, e))
}

/// Load a query from the tests/test_data/queries directory
pub fn load_query(name: &str) -> AggregationQuery {
    let path = format!("tests/test_data/queries/{}", name);
    parser::parse_query_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load test query {}: {}", name, e))
}

// =============================================================================
// SQLite fixture
// =============================================================================

/// One row of the `sales_fact` fixture table
#[derive(Debug, Clone, Copy)]
pub struct SaleRow {
    pub ts: &'static str,
    pub region: Option<&'static str>,
    pub city: &'static str,
    pub amount: i64,
    pub clicks: i64,
    pub impressions: i64,
}

const fn sale(
    ts: &'static str,
    region: Option<&'static str>,
    city: &'static str,
    amount: i64,
    clicks: i64,
    impressions: i64,
) -> SaleRow {
    SaleRow { ts, region, city, amount, clicks, impressions }
}

pub const SALES: &[SaleRow] = &[
    sale("2024-01-01 08:00:00", Some("US"), "Seattle", 100, 5, 50),
    sale("2024-01-01 12:30:00", Some("US"), "Boston", 50, 2, 0),
    sale("2024-01-02 09:00:00", Some("CA"), "Toronto", 70, 3, 30),
    sale("2024-01-02 18:00:00", Some("MX"), "Monterrey", 20, 0, 0),
    sale("2024-01-03 10:00:00", Some("US"), "Seattle", 30, 1, 10),
    sale("2024-01-03 11:00:00", Some("CA"), "Vancouver", 40, 4, 40),
    sale("2024-01-04 07:00:00", Some("FR"), "Paris", 60, 6, 0),
    sale("2024-01-05 23:00:00", None, "Nowhere", 10, 1, 5),
    sale("2024-02-01 00:00:00", Some("US"), "Seattle", 999, 9, 9),
];

/// A client over a populated SQLite database that lives as long as the fixture
pub struct SalesFixture {
    pub client: SqlBackedClient,
    _dir: TempDir,
}

impl SalesFixture {
    pub async fn new() -> Self {
        Self::with_config(load_config("sales.yaml")).await
    }

    /// Connect with `config`, pointing it at a fresh database file
    pub async fn with_config(mut config: SqlBackendConfig) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        config.database_url = format!("sqlite://{}?mode=rwc", dir.path().join("sales.db").display());

        let client = SqlBackedClient::connect(&config)
            .await
            .unwrap_or_else(|e| panic!("Failed to open fixture database: {}", e));
        sqlx::query::<sqlx::Any>(
            "CREATE TABLE sales_fact (
                ts TEXT NOT NULL,
                region_cd TEXT,
                city TEXT NOT NULL,
                amount INTEGER NOT NULL,
                clicks INTEGER NOT NULL,
                impressions INTEGER NOT NULL
            )",
        )
        .execute(client.pool())
        .await
        .expect("Failed to create fixture table");

        for row in SALES {
            sqlx::query::<sqlx::Any>("INSERT INTO sales_fact VALUES (?, ?, ?, ?, ?, ?)")
                .bind(row.ts)
                .bind(row.region)
                .bind(row.city)
                .bind(row.amount)
                .bind(row.clicks)
                .bind(row.impressions)
                .execute(client.pool())
                .await
                .expect("Failed to insert fixture row");
        }

        Self { client, _dir: dir }
    }

    /// Fixture rows inside `[start, end)`, compared as text
    pub fn rows_between(start: &str, end: &str) -> Vec<SaleRow> {
        SALES
            .iter()
            .filter(|r| r.ts >= start && r.ts < end)
            .copied()
            .collect()
    }
}
