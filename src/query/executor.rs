//! Bounded worker pool (spec §5 "Concurrency & resource model"):
//! `max_parallelism` concurrently-running segment runners, backed by a
//! `Semaphore`, with a hard `max_queue_depth` ceiling on work waiting for
//! a slot — once the queue is full, submission fails fast with
//! `CapacityExceeded` instead of growing an unbounded backlog.

use crate::error::{EngineError, EngineResult};
use crate::query::context::EngineConfig;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct Executor {
    parallelism: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    max_queue_depth: usize,
}

impl Executor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            parallelism: Arc::new(Semaphore::new(config.max_parallelism)),
            queued: Arc::new(AtomicUsize::new(0)),
            max_queue_depth: config.max_queue_depth,
        }
    }

    /// Run `work` once a parallelism slot is free. Rejects immediately,
    /// without waiting, if the queue is already at `max_queue_depth`.
    pub async fn run<F, T>(&self, work: F) -> EngineResult<T>
    where
        F: Future<Output = T>,
    {
        let queued = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        if queued > self.max_queue_depth {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::CapacityExceeded(format!("executor queue depth {} exceeded", self.max_queue_depth)));
        }
        let permit = self.parallelism.acquire().await.map_err(|e| EngineError::internal(e.to_string()));
        self.queued.fetch_sub(1, Ordering::SeqCst);
        let permit = permit?;
        let result = work.await;
        drop(permit);
        Ok(result)
    }

    /// Fan out independent work items, each gated by the same bounded
    /// pool, and collect results in submission order (spec §4.5:
    /// "per-segment runners execute with bounded parallelism").
    pub async fn run_all<F, T>(&self, works: Vec<F>) -> Vec<EngineResult<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = works
            .into_iter()
            .map(|work| {
                let parallelism = self.parallelism.clone();
                let queued = self.queued.clone();
                let max_queue_depth = self.max_queue_depth;
                tokio::spawn(async move {
                    let current = queued.fetch_add(1, Ordering::SeqCst) + 1;
                    if current > max_queue_depth {
                        queued.fetch_sub(1, Ordering::SeqCst);
                        return Err(EngineError::CapacityExceeded(format!(
                            "executor queue depth {} exceeded",
                            max_queue_depth
                        )));
                    }
                    let permit = parallelism
                        .acquire_owned()
                        .await
                        .map_err(|e| EngineError::internal(e.to_string()));
                    queued.fetch_sub(1, Ordering::SeqCst);
                    let permit = permit?;
                    let result = work.await;
                    drop(permit);
                    Ok(result)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_error) => results.push(Err(EngineError::internal(join_error.to_string()))),
            }
        }
        results
    }

    pub fn available_parallelism(&self) -> usize {
        self.parallelism.available_permits()
    }
}
