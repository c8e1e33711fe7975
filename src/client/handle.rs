//! Handle to a query running in the background

use tokio::task::JoinHandle;

use crate::error::{Result, SqlBackendError};
use crate::reconciler::ResponseDocument;

/// Resolves to the response of a submitted query
///
/// Aborting is best-effort: it drops the in-flight statement, which releases
/// the connection, but the engine may keep executing it.
#[derive(Debug)]
pub struct QueryHandle {
    task: JoinHandle<Result<ResponseDocument>>,
}

impl QueryHandle {
    pub(crate) fn new(task: JoinHandle<Result<ResponseDocument>>) -> Self {
        Self { task }
    }

    pub async fn wait(self) -> Result<ResponseDocument> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SqlBackendError::execution("query was cancelled")),
            Err(e) => Err(SqlBackendError::execution(format!("query task failed: {}", e))),
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
