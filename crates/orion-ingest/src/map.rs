//! Canonical channel mapping
//!
//! Walks a decoded field map and produces one normalized observation record
//! in the consumer's unit system. Pure function of its inputs; unmapped
//! channels are explicitly absent with a reason, never defaulted.

use chrono::NaiveDateTime;
use orion_core::{
    convert, target_unit, AbsentReason, ChannelReading, DecodedDocument, Dimension,
    ObservationRecord, Timestamp, UnitSystem,
};
use std::collections::BTreeMap;

/// One row of the canonical channel table.
pub struct ChannelSpec {
    /// Canonical channel identifier in the output record
    pub channel: &'static str,
    /// Source element name in the MicroServer document
    pub source: &'static str,
    /// Dimension the channel is reported in
    pub dimension: Dimension,
}

const fn spec(channel: &'static str, source: &'static str, dimension: Dimension) -> ChannelSpec {
    ChannelSpec {
        channel,
        source,
        dimension,
    }
}

/// Canonical channel -> MicroServer element table. Maintained alongside the
/// mapper; adding a channel means adding a row here.
pub const SENSOR_MAP: &[ChannelSpec] = &[
    spec("windSpeed", "mtWindSpeed", Dimension::Speed),
    spec("windDir", "mtAdjWindDir", Dimension::Direction),
    spec("windGust", "mt2MinWindGustSpeed", Dimension::Speed),
    spec("windGustDir", "mt2MinWindGustDir", Dimension::Direction),
    spec("outTemp", "mtTemp1", Dimension::Temperature),
    spec("windchill", "mtWindChill", Dimension::Temperature),
    spec("dewpoint", "mtDewPoint", Dimension::Temperature),
    spec("heatindex", "mtHeatIndex", Dimension::Temperature),
    spec("extraTemp1", "mtTemp_2", Dimension::Temperature),
    spec("extraTemp2", "mtTemp_3", Dimension::Temperature),
    spec("extraTemp3", "mtTemp_4", Dimension::Temperature),
    spec("rainTotal", "mtRainThisMonth", Dimension::Rain),
    spec("rainRate", "mtRainRate", Dimension::RainRate),
    spec("barometer", "mtAdjBaromPress", Dimension::Pressure),
    spec("outHumidity", "mtRelHumidity", Dimension::Humidity),
    spec("radiation", "mtSolarRadiaton", Dimension::Radiation),
];

/// Formats the MicroServer uses for its sample-time element.
const SAMPLE_TIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Map a decoded document to a normalized record in `target` units.
///
/// The declared unit of every field is authoritative: a value is converted
/// from it or the channel is reported absent, never passed through on an
/// assumed unit system.
pub fn map_record(
    doc: &DecodedDocument,
    target: UnitSystem,
    fetched_at: Timestamp,
) -> ObservationRecord {
    let mut channels = BTreeMap::new();
    for row in SENSOR_MAP {
        let reading = match doc.fields.get(row.source) {
            None => ChannelReading::absent(AbsentReason::SourceMissing),
            Some(field) => {
                let to = target_unit(row.dimension, target);
                match convert(field.value, field.unit, to) {
                    Ok(value) => ChannelReading::Value(value),
                    Err(error) => {
                        tracing::warn!(
                            channel = row.channel,
                            declared = %field.unit,
                            %error,
                            "declared unit not convertible for channel"
                        );
                        ChannelReading::absent(AbsentReason::UnsupportedUnit)
                    }
                }
            }
        };
        channels.insert(row.channel.to_string(), reading);
    }

    ObservationRecord {
        timestamp: resolve_timestamp(doc.sample_time.as_deref(), fetched_at),
        unit_system: target,
        channels,
    }
}

fn resolve_timestamp(sample_time: Option<&str>, fetched_at: Timestamp) -> Timestamp {
    let Some(text) = sample_time else {
        return fetched_at;
    };
    for format in SAMPLE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text.trim(), format) {
            return parsed.and_utc().timestamp();
        }
    }
    tracing::debug!(sample_time = text, "unparseable sample time, using fetch time");
    fetched_at
}
