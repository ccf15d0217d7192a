//! Per-point statistics table

use crate::{Track, TrackPoint, UnitConverter};
#[cfg(feature = "serde")]
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

/// Placeholder for values that are not known
const MISSING: &str = "-";

/// One formatted table row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PointRow {
    pub index: usize,
    pub visible: bool,
    pub time: String,
    pub elevation: String,
    pub delta_distance: String,
    pub distance: String,
    pub speed: String,
    pub slope: String,
    pub ascent: String,
    pub descent: String,
    pub waypoint: String,
}

/// Format every point of `track` for display
///
/// Distances of all rows share the unit chosen for the whole track length.
pub fn point_table(track: &Track, units: &dyn UnitConverter) -> Vec<PointRow> {
    profiling::scope!("table::point_table");

    let (scale, distance_unit) = units.axis_scale(track.total_distance());
    let distance = |meters: f64| format!("{:.2} {distance_unit}", meters * scale);
    let elevation = |meters: f64| {
        let (value, unit) = units.elevation(meters);
        format!("{value:.0} {unit}")
    };

    track
        .points()
        .map(|trkpt| PointRow {
            index: trkpt.total_index,
            visible: trkpt.is_visible(),
            time: format_time(trkpt),
            elevation: trkpt.elevation.map_or_else(|| MISSING.to_string(), elevation),
            delta_distance: distance(trkpt.delta_distance),
            distance: distance(trkpt.distance),
            speed: trkpt.speed.map_or_else(
                || MISSING.to_string(),
                |mps| {
                    let (value, unit) = units.speed(mps);
                    format!("{value:.1} {unit}")
                },
            ),
            slope: trkpt.slope.map_or_else(|| MISSING.to_string(), format_slope),
            ascent: elevation(trkpt.ascent),
            descent: elevation(trkpt.descent),
            waypoint: trkpt
                .waypoint
                .as_ref()
                .map(|key| key.to_string())
                .unwrap_or_default(),
        })
        .collect()
}

fn format_time(trkpt: &TrackPoint) -> String {
    trkpt
        .time
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Slope as degrees and percent
fn format_slope(percent: f64) -> String {
    let degrees = (percent / 100.0).atan().to_degrees();
    format!("{degrees:.0}°({percent:.0}%)")
}
