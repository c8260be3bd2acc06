use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{BatchObserver, BatchRun, Checkpoint, Progress, Threshold};

/// Drives items through an operation strictly in input order
pub struct BatchRunner {
    threshold: Threshold,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(threshold: Threshold) -> Self {
        Self::with_cancellation(threshold, CancellationToken::new())
    }

    pub fn with_cancellation(threshold: Threshold, cancel: CancellationToken) -> Self {
        Self { threshold, cancel }
    }

    /// Token that stops the run at the next item boundary
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Process every item and return all outcomes in input order.
    ///
    /// A checkpoint fires once `threshold.interval(total)` items completed
    /// since the previous one, and always after the last item. When the
    /// token is cancelled the remaining items are skipped and whatever was
    /// completed since the last checkpoint is checkpointed before returning.
    /// Only an observer failure ends the run early with an error.
    pub async fn run<I, O, F, Fut, Obs>(
        &self,
        items: Vec<I>,
        mut operation: F,
        observer: &mut Obs,
    ) -> Result<BatchRun<O>, Obs::Error>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = O>,
        O: Clone,
        Obs: BatchObserver<O>,
    {
        let total = items.len();
        let mut run = BatchRun::new(total);

        if total == 0 {
            info!("Empty batch, nothing to process");
            return Ok(run);
        }

        let interval = self.threshold.interval(total);
        info!(
            "Processing {} items, checkpoint every {} items ({}% threshold)",
            total,
            interval,
            self.threshold.percent()
        );

        let mut since_checkpoint = 0;
        let mut last_percent = None;

        for item in items {
            if self.cancel.is_cancelled() {
                info!(
                    "Batch cancelled after {} of {} items",
                    run.processed(),
                    total
                );
                run.cancelled = true;
                break;
            }

            let outcome = operation(item).await;
            run.results.push(outcome);
            since_checkpoint += 1;

            let progress = run.progress();
            observer.on_progress(progress);

            let percent = progress.percent();
            let finished = progress.processed == total;
            // Same floor percentage as the last snapshot would reuse its name
            let due = since_checkpoint >= interval && last_percent != Some(percent);

            if finished || due {
                Self::checkpoint(&mut run, percent, observer)?;
                since_checkpoint = 0;
                last_percent = Some(percent);
            }
        }

        if run.cancelled && since_checkpoint > 0 {
            let percent = run.progress().percent();
            Self::checkpoint(&mut run, percent, observer)?;
        }

        info!(
            "Batch finished: {}/{} items, {} checkpoints",
            run.processed(),
            total,
            run.checkpoints
        );
        Ok(run)
    }

    fn checkpoint<O, Obs>(
        run: &mut BatchRun<O>,
        percent: u32,
        observer: &mut Obs,
    ) -> Result<(), Obs::Error>
    where
        O: Clone,
        Obs: BatchObserver<O>,
    {
        debug!(
            "Checkpoint at {}% with {} results",
            percent,
            run.results.len()
        );
        observer.on_checkpoint(Checkpoint {
            percent,
            results: run.results.clone(),
        })?;
        run.checkpoints += 1;
        Ok(())
    }
}
