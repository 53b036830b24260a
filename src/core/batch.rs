use crate::core::progress::ProgressObserver;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// What a batch does when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the first error; nothing is produced for the batch.
    #[default]
    Abort,
    /// Record the failure for that item and carry on with the next one.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Rendered,
    Skipped,
}

#[derive(Debug)]
pub enum ItemOutcome<T> {
    Done(T),
    Skipped { reason: String },
}

impl<T> ItemOutcome<T> {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemOutcome::Done(_) => ItemStatus::Rendered,
            ItemOutcome::Skipped { .. } => ItemStatus::Skipped,
        }
    }

    pub fn into_done(self) -> Option<T> {
        match self {
            ItemOutcome::Done(value) => Some(value),
            ItemOutcome::Skipped { .. } => None,
        }
    }
}

/// Runs `step` over `items` strictly in order, one at a time.
///
/// `step` receives the 1-based ordinal of the item. The observer is told
/// about every item that completes, whether it was rendered or skipped.
pub async fn run_batch<'a, I, T, F, Fut>(
    items: &'a [I],
    policy: FailurePolicy,
    observer: &dyn ProgressObserver,
    mut step: F,
) -> Result<Vec<ItemOutcome<T>>>
where
    F: FnMut(usize, &'a I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = items.len();
    observer.on_start(total);

    let mut outcomes = Vec::with_capacity(total);
    for (index, item) in items.iter().enumerate() {
        let ordinal = index + 1;
        let outcome = match step(ordinal, item).await {
            Ok(value) => ItemOutcome::Done(value),
            Err(e) => match policy {
                FailurePolicy::Abort => {
                    observer.on_finish(total);
                    tracing::error!("❌ Dataset {} failed, aborting batch: {}", ordinal, e);
                    return Err(e);
                }
                FailurePolicy::Skip => {
                    tracing::warn!(
                        "Skipping dataset {} due to download issues: {}",
                        ordinal,
                        e
                    );
                    ItemOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
            },
        };
        observer.on_item(ordinal, total, outcome.status());
        outcomes.push(outcome);
    }

    observer.on_finish(total);
    Ok(outcomes)
}
