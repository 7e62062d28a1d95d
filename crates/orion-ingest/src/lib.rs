//! Acquisition pipeline for the Columbia Weather Systems MicroServer
//!
//! This crate polls the station's enhanced XML document over HTTP, decodes
//! the unit-tagged measurements, and maps them into normalized observation
//! records. One poll cycle is a strict fetch -> decode -> map -> emit
//! sequence; a failed cycle reports through the sink and never halts the
//! loop.

pub mod decode;
pub mod fetch;
pub mod map;
pub mod poller;
pub mod retry;

pub use decode::decode;
pub use fetch::{Fetch, StationClient};
pub use map::{map_record, SENSOR_MAP};
pub use poller::{PollConfig, PollHandle, Poller};
pub use retry::{with_retry, RetryExhausted};

use orion_core::{CycleFailure, CycleStage};
use thiserror::Error;

/// Transport-layer failure for one HTTP fetch. Kinds are distinct so the
/// caller can tell an unreachable device from one that answered badly.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("station unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Document-layer failure.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("unrecognized unit {unit:?} on field {field}")]
    UnrecognizedUnit { field: String, unit: String },

    #[error("duplicate field {0} in the same section")]
    DuplicateField(String),
}

/// Everything that can end a poll cycle early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] RetryExhausted<FetchError>),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("cycle deadline exceeded")]
    Deadline,
}

impl CycleError {
    pub fn stage(&self) -> CycleStage {
        match self {
            // The deadline is derived from the retry budget, so an overrun
            // is attributed to the fetch stage.
            CycleError::Fetch(_) | CycleError::Deadline => CycleStage::Fetch,
            CycleError::Decode(_) => CycleStage::Decode,
        }
    }

    /// Cycle failure as reported across the sink boundary.
    pub fn to_failure(&self) -> CycleFailure {
        CycleFailure {
            stage: self.stage(),
            detail: self.to_string(),
        }
    }
}
