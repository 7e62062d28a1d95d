//! Poll loop scheduler
//!
//! Drives fetch -> decode -> map -> emit on a fixed interval. At most one
//! cycle is in flight; a slow cycle delays the next tick instead of
//! stacking concurrent fetches, and a failed cycle reports through the
//! sink and never stops the loop.

use crate::{decode, fetch::Fetch, map::map_record, retry::with_retry, CycleError};
use orion_core::{ObservationRecord, RecordSink, UnitSystem};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, timeout, Instant};

/// Timing knobs for the loop, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between cycle starts
    pub poll_interval: Duration,
    /// Fetch attempts per cycle, including the first
    pub max_tries: u32,
    /// Wait between fetch attempts
    pub retry_wait: Duration,
    /// Per-request HTTP timeout, also used to size the cycle deadline
    pub request_timeout: Duration,
}

impl PollConfig {
    /// Overall budget for one cycle: the whole retry schedule plus slack.
    /// A cycle that overruns this is failed, not left hanging.
    pub fn cycle_deadline(&self) -> Duration {
        self.request_timeout
            .saturating_add(self.retry_wait)
            .saturating_mul(self.max_tries.max(1))
            .saturating_add(Duration::from_secs(5))
    }
}

/// Stops the poller. Dropping the handle also stops it.
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
}

impl PollHandle {
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// The acquisition loop. Generic over the transport so cycles can be
/// driven against a fake in tests.
pub struct Poller<F: Fetch, S: RecordSink> {
    transport: F,
    config: PollConfig,
    target: UnitSystem,
    sink: S,
    stop_rx: watch::Receiver<bool>,
}

impl<F: Fetch, S: RecordSink> Poller<F, S> {
    pub fn new(transport: F, config: PollConfig, target: UnitSystem, sink: S) -> (Self, PollHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        (
            Self {
                transport,
                config,
                target,
                sink,
                stop_rx,
            },
            PollHandle { stop_tx },
        )
    }

    /// Run until stopped. Waits are interruptible, so shutdown latency is
    /// bounded by cycle cancellation rather than the remaining interval.
    pub async fn run(mut self) {
        tracing::info!(
            interval = ?self.config.poll_interval,
            max_tries = self.config.max_tries,
            "poller started"
        );

        let mut next_tick = Instant::now();
        loop {
            tokio::select! {
                _ = self.stop_rx.changed() => break,
                _ = sleep_until(next_tick) => {}
            }

            // Clone so the cycle future and the stop signal can be raced
            // without borrowing self twice. The clone marks the current
            // value seen, so re-check it before waiting.
            let mut stop_rx = self.stop_rx.clone();
            if *stop_rx.borrow_and_update() {
                break;
            }
            let outcome = tokio::select! {
                _ = stop_rx.changed() => break,
                outcome = self.run_cycle() => outcome,
            };
            match outcome {
                Ok(record) => {
                    tracing::debug!(timestamp = record.timestamp, "emitting record");
                    if let Err(error) = self.sink.emit(&record).await {
                        tracing::error!(%error, "sink rejected record");
                    }
                }
                Err(cycle_error) => {
                    tracing::warn!(error = %cycle_error, "cycle failed");
                    if let Err(error) = self.sink.emit_failure(&cycle_error.to_failure()).await {
                        tracing::error!(%error, "sink rejected failure report");
                    }
                }
            }

            // An overlong cycle runs the next one back-to-back; ticks are
            // never stacked.
            next_tick += self.config.poll_interval;
            let now = Instant::now();
            if next_tick < now {
                next_tick = now;
            }
        }

        tracing::info!("poller stopped");
    }

    /// Execute exactly one cycle without touching the sink or the
    /// schedule. Public so tests can single-step without the real clock.
    pub async fn run_cycle(&self) -> Result<ObservationRecord, CycleError> {
        match timeout(self.config.cycle_deadline(), self.cycle_inner()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CycleError::Deadline),
        }
    }

    async fn cycle_inner(&self) -> Result<ObservationRecord, CycleError> {
        let transport = &self.transport;
        let raw = with_retry(
            || transport.fetch(),
            self.config.max_tries,
            self.config.retry_wait,
        )
        .await?;
        let fetched_at = chrono::Utc::now().timestamp();
        let doc = decode(&raw)?;
        Ok(map_record(&doc, self.target, fetched_at))
    }
}
