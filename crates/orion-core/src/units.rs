//! Unit vocabulary and conversion tables
//!
//! The MicroServer's enhanced XML tags every measurement with a unit
//! attribute. This module enumerates that vocabulary and converts values
//! between declared units and the unit system a consumer asked for.

use serde::{Deserialize, Serialize};

/// Unit conversion error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("no conversion from {from} to {to}")]
    ConversionNotSupported { from: Unit, to: Unit },
}

/// Physical dimension of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Temperature,
    Pressure,
    Rain,
    RainRate,
    Speed,
    Direction,
    Humidity,
    Radiation,
}

/// A measurement unit as declared by the station.
///
/// Variant names follow the attribute spellings used by the MicroServer
/// (see `Unit::from_attr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    DegreeC,
    DegreeF,
    InchesHg,
    Hectopascal,
    InchesRain,
    MmRain,
    CmRain,
    InchesPerHour,
    MmPerHour,
    Mph,
    KmPerHour,
    MetersPerSecond,
    Knot,
    Percent,
    CompassDegree,
    WattsPerSquareMeter,
}

impl Unit {
    /// Map a unit attribute string from the XML document to a unit tag.
    /// Returns `None` for anything outside the known vocabulary.
    pub fn from_attr(attr: &str) -> Option<Unit> {
        match attr {
            "degreeC" => Some(Unit::DegreeC),
            "degreeF" => Some(Unit::DegreeF),
            "inchesHg" => Some(Unit::InchesHg),
            "hPa" | "millibars" | "mbar" => Some(Unit::Hectopascal),
            "inchesRain" => Some(Unit::InchesRain),
            "mmRain" => Some(Unit::MmRain),
            "cmRain" => Some(Unit::CmRain),
            "inchesPerHour" => Some(Unit::InchesPerHour),
            "mmPerHour" => Some(Unit::MmPerHour),
            "mph" => Some(Unit::Mph),
            "kmPerHour" => Some(Unit::KmPerHour),
            "metersPerSecond" => Some(Unit::MetersPerSecond),
            "knots" => Some(Unit::Knot),
            "percent" | "%" => Some(Unit::Percent),
            "degrees" => Some(Unit::CompassDegree),
            "wattsPerSquareMeter" => Some(Unit::WattsPerSquareMeter),
            _ => None,
        }
    }

    /// The dimension this unit measures.
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::DegreeC | Unit::DegreeF => Dimension::Temperature,
            Unit::InchesHg | Unit::Hectopascal => Dimension::Pressure,
            Unit::InchesRain | Unit::MmRain | Unit::CmRain => Dimension::Rain,
            Unit::InchesPerHour | Unit::MmPerHour => Dimension::RainRate,
            Unit::Mph | Unit::KmPerHour | Unit::MetersPerSecond | Unit::Knot => Dimension::Speed,
            Unit::CompassDegree => Dimension::Direction,
            Unit::Percent => Dimension::Humidity,
            Unit::WattsPerSquareMeter => Dimension::Radiation,
        }
    }

    /// Canonical attribute spelling, used in error messages.
    pub fn attr_name(&self) -> &'static str {
        match self {
            Unit::DegreeC => "degreeC",
            Unit::DegreeF => "degreeF",
            Unit::InchesHg => "inchesHg",
            Unit::Hectopascal => "hPa",
            Unit::InchesRain => "inchesRain",
            Unit::MmRain => "mmRain",
            Unit::CmRain => "cmRain",
            Unit::InchesPerHour => "inchesPerHour",
            Unit::MmPerHour => "mmPerHour",
            Unit::Mph => "mph",
            Unit::KmPerHour => "kmPerHour",
            Unit::MetersPerSecond => "metersPerSecond",
            Unit::Knot => "knots",
            Unit::Percent => "percent",
            Unit::CompassDegree => "degrees",
            Unit::WattsPerSquareMeter => "wattsPerSquareMeter",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attr_name())
    }
}

/// Target unit system required by the downstream consumer (WeeWX parity:
/// US, Metric, MetricWX).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Us,
    Metric,
    MetricWx,
}

/// The unit a given dimension is reported in under a target system.
pub fn target_unit(dimension: Dimension, system: UnitSystem) -> Unit {
    match (dimension, system) {
        (Dimension::Temperature, UnitSystem::Us) => Unit::DegreeF,
        (Dimension::Temperature, _) => Unit::DegreeC,
        (Dimension::Pressure, UnitSystem::Us) => Unit::InchesHg,
        (Dimension::Pressure, _) => Unit::Hectopascal,
        (Dimension::Rain, UnitSystem::Us) => Unit::InchesRain,
        (Dimension::Rain, UnitSystem::Metric) => Unit::CmRain,
        (Dimension::Rain, UnitSystem::MetricWx) => Unit::MmRain,
        (Dimension::RainRate, UnitSystem::Us) => Unit::InchesPerHour,
        (Dimension::RainRate, _) => Unit::MmPerHour,
        (Dimension::Speed, UnitSystem::Us) => Unit::Mph,
        (Dimension::Speed, UnitSystem::Metric) => Unit::KmPerHour,
        (Dimension::Speed, UnitSystem::MetricWx) => Unit::MetersPerSecond,
        (Dimension::Direction, _) => Unit::CompassDegree,
        (Dimension::Humidity, _) => Unit::Percent,
        (Dimension::Radiation, _) => Unit::WattsPerSquareMeter,
    }
}

// Conversions go through a fixed base unit per dimension: degreeC, hPa,
// mmRain, mmPerHour, kmPerHour. Constants are exact definitions except
// inHg->hPa which matches the WeeWX factor.
fn to_base(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::DegreeC => value,
        Unit::DegreeF => (value - 32.0) * 5.0 / 9.0,
        Unit::Hectopascal => value,
        Unit::InchesHg => value * 33.8639,
        Unit::MmRain => value,
        Unit::InchesRain => value * 25.4,
        Unit::CmRain => value * 10.0,
        Unit::MmPerHour => value,
        Unit::InchesPerHour => value * 25.4,
        Unit::KmPerHour => value,
        Unit::Mph => value * 1.609344,
        Unit::MetersPerSecond => value * 3.6,
        Unit::Knot => value * 1.852,
        Unit::Percent | Unit::CompassDegree | Unit::WattsPerSquareMeter => value,
    }
}

fn from_base(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::DegreeC => value,
        Unit::DegreeF => value * 9.0 / 5.0 + 32.0,
        Unit::Hectopascal => value,
        Unit::InchesHg => value / 33.8639,
        Unit::MmRain => value,
        Unit::InchesRain => value / 25.4,
        Unit::CmRain => value / 10.0,
        Unit::MmPerHour => value,
        Unit::InchesPerHour => value / 25.4,
        Unit::KmPerHour => value,
        Unit::Mph => value / 1.609344,
        Unit::MetersPerSecond => value / 3.6,
        Unit::Knot => value / 1.852,
        Unit::Percent | Unit::CompassDegree | Unit::WattsPerSquareMeter => value,
    }
}

/// Convert a value from its declared unit to another unit of the same
/// dimension. Cross-dimension conversion is an error, never a guess.
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, UnitError> {
    if from == to {
        return Ok(value);
    }
    if from.dimension() != to.dimension() {
        return Err(UnitError::ConversionNotSupported { from, to });
    }
    Ok(from_base(to_base(value, from), to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_conversion() {
        // C to F: 22.5C = 72.5F
        let result = convert(22.5, Unit::DegreeC, Unit::DegreeF).unwrap();
        assert!((result - 72.5).abs() < 1e-9);

        // F to C: 212F = 100C
        let result = convert(212.0, Unit::DegreeF, Unit::DegreeC).unwrap();
        assert!((result - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pressure_conversion() {
        let result = convert(29.92, Unit::InchesHg, Unit::Hectopascal).unwrap();
        assert!((result - 1013.208).abs() < 0.1);
        let back = convert(result, Unit::Hectopascal, Unit::InchesHg).unwrap();
        assert!((back - 29.92).abs() < 1e-9);
    }

    #[test]
    fn test_speed_conversion() {
        // knots to mph via the km/h base
        let result = convert(10.0, Unit::Knot, Unit::Mph).unwrap();
        assert!((result - 11.5078).abs() < 1e-3);

        let result = convert(36.0, Unit::KmPerHour, Unit::MetersPerSecond).unwrap();
        assert!((result - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rain_conversion() {
        let result = convert(1.0, Unit::InchesRain, Unit::MmRain).unwrap();
        assert!((result - 25.4).abs() < 1e-9);
        let result = convert(25.4, Unit::MmRain, Unit::CmRain).unwrap();
        assert!((result - 2.54).abs() < 1e-9);
    }

    #[test]
    fn test_same_unit_is_identity() {
        assert_eq!(convert(25.0, Unit::DegreeF, Unit::DegreeF).unwrap(), 25.0);
    }

    #[test]
    fn test_cross_dimension_is_rejected() {
        let err = convert(42.0, Unit::CompassDegree, Unit::DegreeF).unwrap_err();
        assert_eq!(
            err,
            UnitError::ConversionNotSupported {
                from: Unit::CompassDegree,
                to: Unit::DegreeF,
            }
        );
    }

    #[test]
    fn test_round_trip_is_exact_up_to_rounding() {
        let cases = [
            (72.5, Unit::DegreeF, Unit::DegreeC),
            (1013.25, Unit::Hectopascal, Unit::InchesHg),
            (12.7, Unit::MmRain, Unit::InchesRain),
            (8.5, Unit::Mph, Unit::Knot),
        ];
        for (value, from, to) in cases {
            let there = convert(value, from, to).unwrap();
            let back = convert(there, to, from).unwrap();
            assert!((back - value).abs() < 1e-9, "{value} {from} -> {to}");
        }
    }

    #[test]
    fn test_unit_vocabulary() {
        assert_eq!(Unit::from_attr("degreeF"), Some(Unit::DegreeF));
        assert_eq!(Unit::from_attr("millibars"), Some(Unit::Hectopascal));
        assert_eq!(Unit::from_attr("knots"), Some(Unit::Knot));
        assert_eq!(Unit::from_attr("furlongsPerFortnight"), None);
    }

    #[test]
    fn test_target_units() {
        assert_eq!(
            target_unit(Dimension::Speed, UnitSystem::MetricWx),
            Unit::MetersPerSecond
        );
        assert_eq!(target_unit(Dimension::Rain, UnitSystem::Metric), Unit::CmRain);
        assert_eq!(
            target_unit(Dimension::Pressure, UnitSystem::Us),
            Unit::InchesHg
        );
        // Direction is dimensionless across all systems
        assert_eq!(
            target_unit(Dimension::Direction, UnitSystem::Us),
            Unit::CompassDegree
        );
    }
}
