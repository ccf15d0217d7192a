//! Unit conversion from SI values to display units

use crate::ProfileError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meters per foot
pub const FOOT_IN_METERS: f64 = 0.3048;
/// Meters per statute mile
pub const MILE_IN_METERS: f64 = 1609.344;
/// Meters per nautical mile
pub const NAUTICAL_MILE_IN_METERS: f64 = 1852.0;

/// Converts raw meters and seconds into display values
///
/// Every conversion returns the value together with its unit label.
pub trait UnitConverter: Send + Sync {
    /// Factor converting meters of elevation into the base unit
    fn base_factor(&self) -> f64;

    /// Label of the base unit used for elevations
    fn base_unit(&self) -> &'static str;

    /// Scale and unit to label a distance axis spanning `meters`
    fn axis_scale(&self, meters: f64) -> (f64, &'static str);

    /// Convert a distance for display
    fn distance(&self, meters: f64) -> (f64, &'static str) {
        let (scale, unit) = self.axis_scale(meters);
        (meters * scale, unit)
    }

    /// Convert an elevation for display
    fn elevation(&self, meters: f64) -> (f64, &'static str) {
        (meters * self.base_factor(), self.base_unit())
    }

    /// Convert a speed in meters per second for display
    fn speed(&self, meters_per_second: f64) -> (f64, &'static str);
}

/// Built-in unit systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
    Nautical,
}

impl UnitConverter for UnitSystem {
    fn base_factor(&self) -> f64 {
        match self {
            Self::Metric => 1.0,
            Self::Imperial | Self::Nautical => 1.0 / FOOT_IN_METERS,
        }
    }

    fn base_unit(&self) -> &'static str {
        match self {
            Self::Metric => "m",
            Self::Imperial | Self::Nautical => "ft",
        }
    }

    fn axis_scale(&self, meters: f64) -> (f64, &'static str) {
        match self {
            Self::Metric if meters < 1000.0 => (1.0, "m"),
            Self::Metric => (1.0 / 1000.0, "km"),
            Self::Imperial if meters < MILE_IN_METERS => (1.0 / FOOT_IN_METERS, "ft"),
            Self::Imperial => (1.0 / MILE_IN_METERS, "mi"),
            Self::Nautical => (1.0 / NAUTICAL_MILE_IN_METERS, "nm"),
        }
    }

    fn speed(&self, meters_per_second: f64) -> (f64, &'static str) {
        match self {
            Self::Metric => (meters_per_second * 3.6, "km/h"),
            Self::Imperial => (meters_per_second * 3600.0 / MILE_IN_METERS, "mi/h"),
            Self::Nautical => (meters_per_second * 3600.0 / NAUTICAL_MILE_IN_METERS, "kn"),
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Nautical => "nautical",
        };
        f.write_str(name)
    }
}

impl FromStr for UnitSystem {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            "nautical" => Ok(Self::Nautical),
            _ => Err(ProfileError::UnknownVariant {
                kind: "unit system",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_distance_switches_to_km() {
        let (value, unit) = UnitSystem::Metric.distance(250.0);
        assert_eq!(unit, "m");
        assert!((value - 250.0).abs() < f64::EPSILON);

        let (value, unit) = UnitSystem::Metric.distance(12_500.0);
        assert_eq!(unit, "km");
        assert!((value - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_imperial_elevation_in_feet() {
        let (value, unit) = UnitSystem::Imperial.elevation(100.0);
        assert_eq!(unit, "ft");
        assert!((value - 328.084).abs() < 0.001);
    }

    #[test]
    fn test_imperial_distance_switches_to_miles() {
        assert_eq!(UnitSystem::Imperial.distance(100.0).1, "ft");
        let (value, unit) = UnitSystem::Imperial.distance(2.0 * MILE_IN_METERS);
        assert_eq!(unit, "mi");
        assert!((value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_speed_conversions() {
        let (kmh, _) = UnitSystem::Metric.speed(10.0);
        assert!((kmh - 36.0).abs() < 1e-9);
        let (knots, unit) = UnitSystem::Nautical.speed(NAUTICAL_MILE_IN_METERS / 3600.0);
        assert_eq!(unit, "kn");
        assert!((knots - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_and_display() {
        for system in [UnitSystem::Metric, UnitSystem::Imperial, UnitSystem::Nautical] {
            let parsed: UnitSystem = system.to_string().parse().unwrap();
            assert_eq!(parsed, system);
        }
        assert_eq!("IMPERIAL".parse::<UnitSystem>().unwrap(), UnitSystem::Imperial);
        assert!("furlongs".parse::<UnitSystem>().is_err());
    }
}
