//! Selection of the track points that make up a profile

use crate::{PlotMode, Track, WaypointResolver};
use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Point of interest drawn on top of the profile
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointTag {
    /// Position in profile coordinates (distance, elevation)
    pub point: Coord<f64>,
    pub icon: Option<String>,
    pub label: String,
}

/// Index-aligned samples of the visible points that carry an elevation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSamples {
    /// Longitude / latitude in radians
    pub coords: Vec<Coord<f64>>,
    /// Distance along the track in meters
    pub distances: Vec<f64>,
    /// Elevation scaled by the unit base factor
    pub elevations: Vec<f64>,
    /// (distance, scaled elevation) vertices of the GPS line
    pub line: Vec<Coord<f64>>,
    pub tags: Vec<PointTag>,
}

impl TrackSamples {
    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// Collect the samples of all visible points with a known elevation
///
/// Hidden points and points without elevation are skipped without affecting the
/// following points. Waypoint tags are emitted for surviving points in
/// [`PlotMode::Normal`] only, and only when `waypoints` resolves the point's key.
pub fn select_points(
    track: &Track,
    base_factor: f64,
    waypoints: Option<&dyn WaypointResolver>,
    mode: PlotMode,
) -> TrackSamples {
    profiling::scope!("filter::select_points");

    let capacity = track.visible_point_count();
    let mut samples = TrackSamples {
        coords: Vec::with_capacity(capacity),
        distances: Vec::with_capacity(capacity),
        elevations: Vec::with_capacity(capacity),
        line: Vec::with_capacity(capacity),
        tags: Vec::new(),
    };

    for trkpt in track.points().filter(|p| p.is_visible()) {
        let Some(ele) = trkpt.elevation else {
            continue;
        };

        let vertex = Coord {
            x: trkpt.distance,
            y: ele * base_factor,
        };
        samples.distances.push(vertex.x);
        samples.elevations.push(vertex.y);
        samples.line.push(vertex);
        samples.coords.push(trkpt.position_radians());

        if mode == PlotMode::Icon {
            continue;
        }
        let (Some(resolver), Some(key)) = (waypoints, trkpt.waypoint.as_ref()) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        if let Some(wpt) = resolver.resolve_waypoint(key) {
            samples.tags.push(PointTag {
                point: vertex,
                icon: wpt.icon.clone(),
                label: wpt.name.clone(),
            });
        }
    }

    tracing::debug!(
        "Selected {} of {} points of track {:?}",
        samples.len(),
        track.total_points(),
        track.name()
    );
    samples
}
