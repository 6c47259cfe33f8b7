//! Coalesces deletes into batch writes.

use std::time::Duration;

use dynamesa_core::Item;

use crate::backend::{TableBackend, BATCH_WRITE_LIMIT};
use crate::error::Result;

const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Buffers delete keys and sends them [`BATCH_WRITE_LIMIT`] at a time.
///
/// Keys the service leaves unprocessed go back into the buffer and are sent
/// again with the next batch. [`flush`](BatchWriter::flush) must be called
/// once at the end.
pub(crate) struct BatchWriter<'a> {
    backend: &'a dyn TableBackend,
    table_name: &'a str,
    pending: Vec<Item>,
    deleted: usize,
    retries: u32,
}

impl<'a> BatchWriter<'a> {
    pub(crate) fn new(backend: &'a dyn TableBackend, table_name: &'a str) -> Self {
        Self {
            backend,
            table_name,
            pending: Vec::new(),
            deleted: 0,
            retries: 0,
        }
    }

    pub(crate) async fn delete(&mut self, key: Item) -> Result<()> {
        self.pending.push(key);
        if self.pending.len() >= BATCH_WRITE_LIMIT {
            self.send_batch().await?;
        }
        Ok(())
    }

    /// Sends everything still buffered. Returns the number of deleted rows.
    pub(crate) async fn flush(mut self) -> Result<usize> {
        while !self.pending.is_empty() {
            self.send_batch().await?;
        }
        Ok(self.deleted)
    }

    async fn send_batch(&mut self) -> Result<()> {
        let take = self.pending.len().min(BATCH_WRITE_LIMIT);
        let batch: Vec<Item> = self.pending.drain(..take).collect();
        let sent = batch.len();

        let unprocessed = self.backend.batch_delete(self.table_name, batch).await?;
        self.deleted += sent - unprocessed.len();

        if unprocessed.is_empty() {
            self.retries = 0;
            return Ok(());
        }

        tracing::warn!(
            table = %self.table_name,
            unprocessed = unprocessed.len(),
            "Resubmitting unprocessed deletes"
        );
        self.pending.extend(unprocessed);

        let backoff = Duration::from_millis(50u64 << self.retries.min(5)).min(MAX_BACKOFF);
        self.retries += 1;
        tokio::time::sleep(backoff).await;
        Ok(())
    }
}
