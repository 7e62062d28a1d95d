use anyhow::Result;

use crate::{CycleFailure, ObservationRecord};

/// Downstream consumer of poll-cycle outcomes. The host process supplies one
/// implementation; the poller calls it exactly once per cycle, in cycle
/// order. Implementations should not block the loop for long.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn emit(&mut self, record: &ObservationRecord) -> Result<()>;

    async fn emit_failure(&mut self, failure: &CycleFailure) -> Result<()>;
}
