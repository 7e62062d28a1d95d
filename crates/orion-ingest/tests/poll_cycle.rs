//! End-to-end poll cycle tests against a scripted transport

use orion_core::{CycleFailure, CycleStage, ObservationRecord, RecordSink, UnitSystem};
use orion_ingest::{CycleError, Fetch, FetchError, PollConfig, PollHandle, Poller};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const DOC: &str = r#"<oriondata>
  <meas name="mtSampTime">2023/11/14 22:13:20</meas>
  <meas name="mtTemp1" unit="degreeF">72.5</meas>
  <meas name="mtWindSpeed" unit="mph">8.4</meas>
  <meas name="mtAdjBaromPress" unit="inchesHg">29.92</meas>
  <meas name="mtRelHumidity" unit="percent">48</meas>
</oriondata>"#;

/// Fake transport that plays back a fixed script, then fails. A `hang`
/// transport never completes, to exercise the cycle deadline.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Vec<u8>, FetchError>>>,
    calls: Arc<AtomicU32>,
    hang: bool,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<Vec<u8>, FetchError>>) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Self {
                script: Mutex::new(script.into()),
                calls: Arc::clone(&calls),
                hang: false,
            },
            calls,
        )
    }

    fn hanging() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Arc::new(AtomicU32::new(0)),
            hang: true,
        }
    }
}

#[async_trait::async_trait]
impl Fetch for ScriptedTransport {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        if self.hang {
            return std::future::pending().await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Unreachable("script exhausted".to_string())))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Record(ObservationRecord),
    Failure(CycleFailure),
}

#[derive(Clone)]
struct CollectSink {
    outcomes: Arc<Mutex<Vec<Outcome>>>,
}

impl CollectSink {
    fn new() -> (Self, Arc<Mutex<Vec<Outcome>>>) {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                outcomes: Arc::clone(&outcomes),
            },
            outcomes,
        )
    }
}

#[async_trait::async_trait]
impl RecordSink for CollectSink {
    async fn emit(&mut self, record: &ObservationRecord) -> anyhow::Result<()> {
        self.outcomes.lock().unwrap().push(Outcome::Record(record.clone()));
        Ok(())
    }

    async fn emit_failure(&mut self, failure: &CycleFailure) -> anyhow::Result<()> {
        self.outcomes.lock().unwrap().push(Outcome::Failure(failure.clone()));
        Ok(())
    }
}

fn config(max_tries: u32, retry_wait: Duration) -> PollConfig {
    PollConfig {
        poll_interval: Duration::from_secs(10),
        max_tries,
        retry_wait,
        request_timeout: Duration::from_secs(4),
    }
}

fn poller(
    transport: ScriptedTransport,
    config: PollConfig,
) -> (Poller<ScriptedTransport, CollectSink>, PollHandle, Arc<Mutex<Vec<Outcome>>>) {
    let (sink, outcomes) = CollectSink::new();
    let (poller, handle) = Poller::new(transport, config, UnitSystem::Us, sink);
    (poller, handle, outcomes)
}

async fn wait_for_outcomes(outcomes: &Arc<Mutex<Vec<Outcome>>>, n: usize) {
    loop {
        if outcomes.lock().unwrap().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_station_exhausts_exact_retry_budget() {
    // Scenario C: device unreachable, 3 tries, 5s between attempts
    let (transport, calls) = ScriptedTransport::new(vec![]);
    let (poller, _handle, _) = poller(transport, config(3, Duration::from_secs(5)));

    let started = Instant::now();
    let outcome = poller.run_cycle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    match outcome {
        Err(CycleError::Fetch(exhausted)) => {
            assert_eq!(exhausted.tries, 3);
            assert!(matches!(exhausted.last, FetchError::Unreachable(_)));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_does_not_affect_the_next() {
    // Fault injected into exactly one cycle out of three
    let (transport, _) = ScriptedTransport::new(vec![
        Ok(DOC.as_bytes().to_vec()),
        Err(FetchError::Unreachable("powered off".to_string())),
        Ok(DOC.as_bytes().to_vec()),
    ]);
    let (poller, handle, outcomes) = poller(transport, config(1, Duration::ZERO));

    let task = tokio::spawn(poller.run());
    wait_for_outcomes(&outcomes, 3).await;
    handle.stop();
    task.await.unwrap();

    let outcomes = outcomes.lock().unwrap();
    match (&outcomes[0], &outcomes[1], &outcomes[2]) {
        (Outcome::Record(first), Outcome::Failure(failure), Outcome::Record(third)) => {
            assert_eq!(failure.stage, CycleStage::Fetch);
            // The failed middle cycle leaves no trace in the record after it
            assert_eq!(first, third);
            assert_eq!(first.timestamp, 1_700_000_000);
            assert_eq!(first.value("outTemp"), Some(72.5));
        }
        other => panic!("unexpected outcome sequence: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_garbage_document_is_a_decode_failure() {
    let (transport, _) = ScriptedTransport::new(vec![Ok(b"not xml".to_vec())]);
    let (poller, _handle, _) = poller(transport, config(1, Duration::ZERO));

    match poller.run_cycle().await {
        Err(CycleError::Decode(_)) => {}
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_hung_transport_hits_the_cycle_deadline() {
    let transport = ScriptedTransport::hanging();
    let cfg = config(3, Duration::from_secs(5));
    let deadline = cfg.cycle_deadline();
    let (poller, _handle, _) = poller(transport, cfg);

    let started = Instant::now();
    let outcome = poller.run_cycle().await;

    assert!(matches!(outcome, Err(CycleError::Deadline)));
    assert_eq!(started.elapsed(), deadline);
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_the_interval_wait() {
    let (transport, _) = ScriptedTransport::new(vec![Ok(DOC.as_bytes().to_vec())]);
    let (poller, handle, outcomes) = poller(transport, config(1, Duration::ZERO));

    let task = tokio::spawn(poller.run());
    wait_for_outcomes(&outcomes, 1).await;

    // The loop is now sleeping toward the next tick; stop must not wait
    // out the remaining interval.
    handle.stop();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("poller did not stop promptly")
        .unwrap();
}
