//! Pooled SQL backend client

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::Any;
use tracing::{debug, info, warn};

use crate::config::SqlBackendConfig;
use crate::converter::{CompiledQuery, SqlConverter};
use crate::error::{Result, SqlBackendError};
use crate::mapper::FieldMapper;
use crate::query::AggregationQuery;
use crate::reconciler::{ResponseDocument, ResultSetProcessor};
use crate::schema::TableSchema;

use super::handle::QueryHandle;
use super::row::{column_names, decode_row};

/// A query compiled against its table, ready to run
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub query: AggregationQuery,
    pub mapper: FieldMapper,
    pub compiled: CompiledQuery,
}

impl PreparedQuery {
    pub fn sql(&self) -> &str {
        &self.compiled.sql
    }
}

/// Executes aggregation queries against one SQL database
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct SqlBackedClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    pool: AnyPool,
    converter: SqlConverter,
    tables: HashMap<String, TableSchema>,
    query_timeout: Option<Duration>,
}

impl SqlBackedClient {
    /// Open a connection pool for `config.database_url`
    pub async fn connect(config: &SqlBackendConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.database_url)
            .await
            .map_err(|e| SqlBackendError::driver("failed to open connection pool", e))?;
        info!(
            dialect = ?config.dialect,
            max_connections = config.max_connections,
            tables = config.tables.len(),
            "connected to SQL backend"
        );
        Ok(Self::with_pool(pool, config))
    }

    /// Wrap an existing pool; connection settings in `config` are ignored
    pub fn with_pool(pool: AnyPool, config: &SqlBackendConfig) -> Self {
        let dialect = config.dialect.build(config.timestamp_format.as_deref());
        let tables = config
            .tables
            .iter()
            .map(|t| (t.name.clone(), t.clone()))
            .collect();
        Self {
            inner: Arc::new(ClientInner {
                pool,
                converter: SqlConverter::new(dialect, config.post_aggregations),
                tables,
                query_timeout: config.query_timeout(),
            }),
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.inner.pool
    }

    pub fn converter(&self) -> &SqlConverter {
        &self.inner.converter
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.inner.tables.get(name)
    }

    /// Compile without executing; every compile-time error surfaces here
    pub fn prepare(&self, query: &AggregationQuery) -> Result<PreparedQuery> {
        let table = self.get_table(&query.data_source).ok_or_else(|| {
            SqlBackendError::InvalidQuery(format!("Unknown data source '{}'", query.data_source))
        })?;
        let mapper = FieldMapper::from_schema(table);
        let compiled = self.inner.converter.compile(query, table, &mapper)?;
        Ok(PreparedQuery {
            query: query.clone(),
            mapper,
            compiled,
        })
    }

    /// Compile, run and reconcile a query
    pub async fn execute(&self, query: &AggregationQuery) -> Result<ResponseDocument> {
        let prepared = self.prepare(query)?;
        self.inner.run(prepared).await
    }

    /// Run a previously prepared query
    pub async fn execute_prepared(&self, prepared: PreparedQuery) -> Result<ResponseDocument> {
        self.inner.run(prepared).await
    }

    /// Compile now and run in the background on the current tokio runtime
    pub fn submit(&self, query: &AggregationQuery) -> Result<QueryHandle> {
        let prepared = self.prepare(query)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SqlBackendError::execution(format!("no async runtime to run the query on: {}", e)))?;
        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move { inner.run(prepared).await });
        Ok(QueryHandle::new(task))
    }

    pub async fn close(&self) {
        self.inner.pool.close().await;
    }
}

impl std::fmt::Debug for SqlBackedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlBackedClient")
            .field("dialect", &self.inner.converter.dialect().name())
            .field("tables", &self.inner.tables.len())
            .field("query_timeout", &self.inner.query_timeout)
            .finish()
    }
}

impl ClientInner {
    async fn run(&self, prepared: PreparedQuery) -> Result<ResponseDocument> {
        let started = Instant::now();
        let result = match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch(&prepared))
                .await
                .unwrap_or_else(|_| {
                    Err(SqlBackendError::execution(format!(
                        "query exceeded timeout of {}s",
                        limit.as_secs()
                    )))
                }),
            None => self.fetch(&prepared).await,
        };
        match &result {
            Ok(document) => info!(
                data_source = %prepared.query.data_source,
                rows = document.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "query completed"
            ),
            Err(e) => warn!(
                data_source = %prepared.query.data_source,
                error = %e,
                "query failed"
            ),
        }
        result
    }

    /// The connection is held for the lifetime of the cursor and released on
    /// every exit path, including cancellation.
    async fn fetch(&self, prepared: &PreparedQuery) -> Result<ResponseDocument> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| SqlBackendError::driver("failed to acquire a connection", e))?;
        debug!(sql = %prepared.compiled.sql, "executing statement");

        let mut processor = ResultSetProcessor::new(&prepared.query, &prepared.mapper, &prepared.compiled);
        let mut rows = sqlx::query::<Any>(&prepared.compiled.sql).fetch(&mut *conn);
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| SqlBackendError::driver("statement execution failed", e))?
        {
            if !processor.is_bound() {
                processor.bind_columns(&column_names(&row))?;
            }
            processor.push_row(decode_row(&row)?)?;
        }
        Ok(processor.finish())
    }
}
