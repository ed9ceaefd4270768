//! Fixed-size concurrent groups with pacing between them.

use futures::future::join_all;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pacing::{Sleeper, TokioSleeper};
use crate::error::Result;
use crate::models::BatchItemOutcome;

pub const CANCELLED_BEFORE_EXECUTION: &str = "cancelled before execution";

pub struct BatchCoordinator {
    batch_size: usize,
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    cancel: Option<CancellationToken>,
}

impl BatchCoordinator {
    /// A batch size of zero is treated as one.
    pub fn new(batch_size: usize, delay: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
            sleeper,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn group_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.batch_size)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }

    /// Run `per_item` over `items`, one group at a time.
    ///
    /// Items inside a group run concurrently and are joined before the next
    /// group starts. A failing item only fails its own outcome. The result
    /// holds one outcome per input item, in input order, even when the run
    /// is cancelled part way.
    pub async fn run<T, L, F, Fut>(&self, items: &[T], label: L, per_item: F) -> Vec<BatchItemOutcome>
    where
        L: Fn(usize, &T) -> String,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let groups = self.group_count(items.len());
        let mut outcomes = Vec::with_capacity(items.len());

        info!(
            items = items.len(),
            batch_size = self.batch_size,
            groups,
            "Starting batch run"
        );

        for (group_index, group) in items.chunks(self.batch_size).enumerate() {
            if self.is_cancelled() {
                let offset = group_index * self.batch_size;
                warn!(
                    group = group_index,
                    skipped = items.len() - offset,
                    "Batch run cancelled"
                );
                outcomes.extend(
                    items[offset..]
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            BatchItemOutcome::failed(label(offset + i, item), CANCELLED_BEFORE_EXECUTION)
                        }),
                );
                break;
            }

            let offset = group_index * self.batch_size;
            debug!(group = group_index, size = group.len(), "Running batch group");

            let results = join_all(group.iter().map(&per_item)).await;
            for (i, (item, result)) in group.iter().zip(results).enumerate() {
                let item_label = label(offset + i, item);
                outcomes.push(match result {
                    Ok(data) => BatchItemOutcome::succeeded(item_label, data),
                    Err(error) => {
                        warn!(item_label = %item_label, error = %error, "Batch item failed");
                        BatchItemOutcome::failed(item_label, error.to_string())
                    }
                });
            }

            if group_index + 1 < groups {
                self.pause().await;
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.success()).count();
        info!(
            total = outcomes.len(),
            succeeded,
            failed = outcomes.len() - succeeded,
            "Batch run finished"
        );
        outcomes
    }

    async fn pause(&self) {
        debug!(delay_ms = self.delay.as_millis() as u64, "Pausing between batch groups");
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = self.sleeper.sleep(self.delay) => {}
                    _ = token.cancelled() => {}
                }
            }
            None => self.sleeper.sleep(self.delay).await,
        }
    }
}

/// Run `per_item` over `items` in groups of `batch_size` on the tokio timer,
/// labelling items by position.
pub async fn run_batches<T, F, Fut>(
    items: &[T],
    per_item: F,
    batch_size: usize,
    delay: Duration,
) -> Vec<BatchItemOutcome>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    BatchCoordinator::new(batch_size, delay, Arc::new(TokioSleeper))
        .run(items, |index, _| format!("item-{}", index), per_item)
        .await
}
