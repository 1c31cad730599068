//! The core poll loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;

use super::{is_terminal, ProgressSink, RunHandle, RunOutcome, RunStatus};

/// Default wait between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Source of run status snapshots.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of the run.
    async fn fetch(&self, handle: &RunHandle) -> Result<RunStatus, ClientError>;
}

/// How a monitoring session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorResult {
    /// The run reached a terminal state.
    Finished {
        outcome: RunOutcome,
        elapsed_secs: u64,
    },
    /// The cancellation token fired between polls.
    Cancelled,
}

/// Polls a run at a fixed interval until it reaches a terminal state.
///
/// Fetch failures are soft: the loop reports them through the sink and
/// retries on the next interval, with no backoff and no retry limit. There
/// is no overall deadline either; termination depends on the orchestrator
/// eventually reporting a terminal state.
pub struct Monitor<S> {
    source: S,
    interval: Duration,
    cancel: CancellationToken,
}

impl<S: StatusSource> Monitor<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attach a cancellation token, checked between iterations so output is
    /// never torn mid-render.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Block until the run reaches a terminal state or the token fires.
    pub async fn monitor(&self, handle: &RunHandle, sink: &mut dyn ProgressSink) -> MonitorResult {
        tracing::info!(run_id = %handle.run_id, "Monitoring DAG run");
        let start = Instant::now();
        let mut previous_state: Option<String> = None;
        let mut spinner_phase = 0_usize;

        loop {
            match self.source.fetch(handle).await {
                Err(error) => sink.fetch_error(&error),
                Ok(status) => {
                    let state = status.state.to_lowercase();
                    let elapsed = start.elapsed().as_secs();

                    if is_terminal(&state) {
                        sink.finished(&state, elapsed);
                        return MonitorResult::Finished {
                            outcome: RunOutcome::from_state(&state),
                            elapsed_secs: elapsed,
                        };
                    }

                    sink.tick(spinner_phase, &state, elapsed);
                    spinner_phase = spinner_phase.wrapping_add(1);

                    if previous_state.as_deref() != Some(state.as_str()) {
                        sink.state_changed(&state);
                        previous_state = Some(state);
                    }
                }
            }

            tokio::select! {
                () = self.cancel.cancelled() => return MonitorResult::Cancelled,
                () = sleep(self.interval) => {}
            }
        }
    }
}
