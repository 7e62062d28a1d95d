//! Stdout sink: one JSON line per cycle outcome
//!
//! This is the downstream-consumer side of the boundary, so it is allowed
//! to keep state across cycles; it derives a per-cycle `rain` delta from
//! successive month-to-date rain totals.

use anyhow::Result;
use orion_core::{CycleFailure, ObservationRecord, RecordSink};
use tracing::{info, warn};

pub struct StdoutSink {
    last_rain_total: Option<f64>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            last_rain_total: None,
        }
    }

    /// Delta between successive rain totals. A total lower than the last
    /// one means the station's counter reset (month rollover), in which
    /// case the new total is the rain since the reset.
    fn rain_delta(&mut self, total: Option<f64>) -> Option<f64> {
        let total = total?;
        let delta = match self.last_rain_total {
            Some(last) if total >= last => Some(total - last),
            Some(last) => {
                warn!(last, total, "rain total went backwards, assuming counter reset");
                Some(total)
            }
            None => None,
        };
        self.last_rain_total = Some(total);
        delta
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordSink for StdoutSink {
    async fn emit(&mut self, record: &ObservationRecord) -> Result<()> {
        let mut json = serde_json::to_value(record)?;
        if let Some(delta) = self.rain_delta(record.value("rainTotal")) {
            json["rain"] = delta.into();
        }
        println!("{json}");
        info!(timestamp = record.timestamp, "record emitted");
        Ok(())
    }

    async fn emit_failure(&mut self, failure: &CycleFailure) -> Result<()> {
        warn!(stage = ?failure.stage, detail = %failure.detail, "cycle failed");
        Ok(())
    }
}
