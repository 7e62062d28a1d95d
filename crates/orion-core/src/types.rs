//! Data types crossing the pipeline's boundaries

use crate::units::{Unit, UnitSystem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp type (Unix epoch seconds)
pub type Timestamp = i64;

/// One unit-tagged measurement decoded from the station document.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// Element name as reported by the station (e.g. `mtTemp1`)
    pub name: String,

    /// Original text content, kept for diagnostics
    pub raw_value: String,

    /// Parsed numeric value, in `unit`
    pub value: f64,

    /// Declared unit from the document's unit attribute
    pub unit: Unit,

    /// Remaining element attributes
    pub attributes: BTreeMap<String, String>,
}

/// Faithful typed transcription of one enhanced-format document.
///
/// Keys are element names, or `section.name` composites when the same name
/// recurs in distinct sections. Channel semantics live in the mapper, not
/// here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedDocument {
    pub fields: BTreeMap<String, DecodedField>,

    /// Raw text of the station's own sample-time element, if present
    pub sample_time: Option<String>,
}

/// Why a channel carries no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
    /// The source field was not present in the document
    SourceMissing,
    /// The declared unit has no conversion path to the channel's target unit
    UnsupportedUnit,
}

/// A canonical channel slot: either a value in the target unit system or an
/// explicit absence with its reason. Never a defaulted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelReading {
    Value(f64),
    Absent { absent: AbsentReason },
}

impl ChannelReading {
    pub fn absent(reason: AbsentReason) -> Self {
        ChannelReading::Absent { absent: reason }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ChannelReading::Value(v) => Some(*v),
            ChannelReading::Absent { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<AbsentReason> {
        match self {
            ChannelReading::Value(_) => None,
            ChannelReading::Absent { absent } => Some(*absent),
        }
    }
}

/// Normalized observation record, the sole artifact crossing the output
/// boundary. Every present channel value is in `unit_system`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Unix timestamp: the document's own sample time when present, else
    /// the time the fetch completed
    #[serde(rename = "dateTime")]
    pub timestamp: Timestamp,

    /// Unit system every present channel value is expressed in
    #[serde(rename = "usUnits")]
    pub unit_system: UnitSystem,

    /// Canonical channel name -> reading
    #[serde(flatten)]
    pub channels: BTreeMap<String, ChannelReading>,
}

impl ObservationRecord {
    /// Present channel value, if any.
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).and_then(ChannelReading::as_f64)
    }
}

/// Stage of the poll cycle a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStage {
    Fetch,
    Decode,
    Map,
}

/// Cycle-level failure reported to the downstream error sink. Downstream
/// code branches on `stage`, not on message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFailure {
    pub stage: CycleStage,
    pub detail: String,
}

impl std::fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cycle failed at {:?}: {}", self.stage, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_reading_accessors() {
        let value = ChannelReading::Value(72.5);
        assert_eq!(value.as_f64(), Some(72.5));
        assert_eq!(value.reason(), None);

        let absent = ChannelReading::absent(AbsentReason::SourceMissing);
        assert_eq!(absent.as_f64(), None);
        assert_eq!(absent.reason(), Some(AbsentReason::SourceMissing));
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut channels = BTreeMap::new();
        channels.insert("outTemp".to_string(), ChannelReading::Value(72.5));
        channels.insert(
            "barometer".to_string(),
            ChannelReading::absent(AbsentReason::SourceMissing),
        );
        let record = ObservationRecord {
            timestamp: 1700000000,
            unit_system: UnitSystem::Us,
            channels,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["dateTime"], 1700000000);
        assert_eq!(json["usUnits"], "us");
        assert_eq!(json["outTemp"], 72.5);
        assert_eq!(json["barometer"]["absent"], "source_missing");
    }
}
