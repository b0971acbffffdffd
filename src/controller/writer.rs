//! Background cache writer
//!
//! Network responses are handed to a queue and stored by a spawned task,
//! so the fetch path returns without waiting on the cache store. A failed
//! write is logged and dropped; nothing is reported back to the caller.

use crate::http::{RequestKey, Response};
use crate::storage::CacheStorage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

enum WriteJob {
    Put {
        generation: String,
        key: RequestKey,
        response: Response,
    },
    Flush(oneshot::Sender<()>),
}

/// Counters for writes processed by the worker
#[derive(Debug, Default)]
pub struct WriterStats {
    written: AtomicU64,
    failed: AtomicU64,
}

impl WriterStats {
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Handle to the write-behind queue
#[derive(Clone)]
pub struct CacheWriter {
    tx: mpsc::UnboundedSender<WriteJob>,
    stats: Arc<WriterStats>,
}

impl CacheWriter {
    /// Spawn the worker task on the current tokio runtime
    pub fn spawn(storage: Arc<dyn CacheStorage>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
        let stats = Arc::new(WriterStats::default());
        let worker_stats = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    WriteJob::Put {
                        generation,
                        key,
                        response,
                    } => match storage.put(&generation, &key, &response).await {
                        Ok(()) => {
                            worker_stats.written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                            warn!("Background cache write failed for {}: {}", key, e);
                        }
                    },
                    WriteJob::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Cache writer stopped");
        });

        Self { tx, stats }
    }

    /// Queue a response for storage. Never blocks and never fails.
    pub fn submit(&self, generation: &str, key: RequestKey, response: Response) {
        let job = WriteJob::Put {
            generation: generation.to_string(),
            key,
            response,
        };
        if self.tx.send(job).is_err() {
            debug!("Cache writer gone, dropping write");
        }
    }

    /// Wait until every write queued before this call has been attempted
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}
