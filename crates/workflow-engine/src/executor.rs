//! Planner/Executor
//!
//! Issues writes in bounded chunks and waits on each chunk's task before the
//! next chunk of the same family is sent. A failed chunk never stops the
//! remaining chunks; the caller gets one [`ChunkResult`] per chunk and decides
//! which bucket its items land in.

use crate::outcome::OutcomeReport;
use crate::task_waiter::{AsyncHandle, TaskWaiter};
use controller_client::{ApiError, ControllerClientTrait};
use std::future::Future;
use tracing::{debug, info, warn};

/// Result of one chunk
#[derive(Debug)]
pub struct ChunkResult<'a, T> {
    /// Items sent in the chunk
    pub items: &'a [T],
    /// `Err` carries the Controller's failure reason
    pub result: Result<(), String>,
}

/// Writes against one Controller
#[derive(Clone, Copy)]
pub struct Executor<'a> {
    client: &'a dyn ControllerClientTrait,
    waiter: TaskWaiter,
}

impl std::fmt::Debug for Executor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.client.base_url())
            .field("waiter", &self.waiter)
            .finish()
    }
}

impl<'a> Executor<'a> {
    pub fn new(client: &'a dyn ControllerClientTrait, waiter: TaskWaiter) -> Self {
        Self { client, waiter }
    }

    /// Issue one write and wait for its task
    ///
    /// Transport errors and task failures both come back as `Err(reason)`
    /// and are counted on the report.
    pub async fn execute<Fut, H>(&self, report: &mut OutcomeReport, description: &str, write: Fut) -> Result<(), String>
    where
        Fut: Future<Output = Result<H, ApiError>>,
        H: Into<AsyncHandle>,
    {
        debug!("Issuing {}", description);
        let result = match write.await {
            Ok(handle) => {
                let handle = handle.into();
                self.waiter.wait(self.client, &handle).await.into_result()
            }
            Err(e) => Err(e.to_string()),
        };
        match &result {
            Ok(()) => info!("{} completed", description),
            Err(reason) => warn!("{} failed: {}", description, reason),
        }
        report.count_write(result.is_ok());
        result
    }

    /// Issue `items` in chunks of at most `chunk_size`
    pub async fn execute_chunked<'i, T, F, Fut, H>(
        &self,
        report: &mut OutcomeReport,
        description: &str,
        items: &'i [T],
        chunk_size: usize,
        mut write: F,
    ) -> Vec<ChunkResult<'i, T>>
    where
        F: FnMut(&'i [T]) -> Fut,
        Fut: Future<Output = Result<H, ApiError>>,
        H: Into<AsyncHandle>,
    {
        let chunk_size = chunk_size.max(1);
        let total = items.len().div_ceil(chunk_size);
        let mut results = Vec::with_capacity(total);
        for (index, chunk) in items.chunks(chunk_size).enumerate() {
            let label = format!("{} (chunk {}/{}, {} items)", description, index + 1, total, chunk.len());
            let result = self.execute(report, &label, write(chunk)).await;
            results.push(ChunkResult { items: chunk, result });
        }
        results
    }
}
