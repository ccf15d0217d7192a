//! Track storage and secondary data derivation
//!
//! This module provides the `Track` struct holding segmented track points. Distance,
//! speed, slope and ascent/descent are derived whenever the visible point set changes.

use crate::{Project, ProfileError, Result, WaypointKey};
use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::Range;
use time::OffsetDateTime;

/// Earth's radius in meters
const EARTH_RADIUS_M: f64 = 6371000.0;

/// A single recorded track point
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackPoint {
    /// Longitude / latitude in degrees
    pub position: Coord<f64>,
    /// Elevation in meters, `None` if the receiver did not record one
    pub elevation: Option<f64>,
    pub time: Option<OffsetDateTime>,
    /// Hidden points are excluded from distance, statistics and profiles
    pub hidden: bool,
    /// Waypoint attached to this point
    pub waypoint: Option<WaypointKey>,

    // Derived by `Track`
    /// Distance from the first visible point in meters
    pub distance: f64,
    /// Distance from the previous visible point in meters
    pub delta_distance: f64,
    /// Speed from the previous visible point in meters per second
    pub speed: Option<f64>,
    /// Slope in percent since the previous visible point with elevation
    pub slope: Option<f64>,
    /// Cumulative ascent in meters
    pub ascent: f64,
    /// Cumulative descent in meters
    pub descent: f64,
    /// Index over all points of the track
    pub total_index: usize,
    /// Index over the visible points, `None` while hidden
    pub visible_index: Option<usize>,
}

impl TrackPoint {
    /// Create a visible point at `lon`/`lat` degrees
    pub fn new(lon: f64, lat: f64, elevation: Option<f64>) -> Self {
        Self {
            position: Coord { x: lon, y: lat },
            elevation,
            time: None,
            hidden: false,
            waypoint: None,
            distance: 0.0,
            delta_distance: 0.0,
            speed: None,
            slope: None,
            ascent: 0.0,
            descent: 0.0,
            total_index: 0,
            visible_index: None,
        }
    }

    pub fn with_time(mut self, time: OffsetDateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_waypoint(mut self, key: WaypointKey) -> Self {
        self.waypoint = Some(key);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Whether this point takes part in distance and profile computations
    #[inline]
    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Position in radians, longitude first
    #[inline]
    pub fn position_radians(&self) -> Coord<f64> {
        Coord {
            x: self.position.x.to_radians(),
            y: self.position.y.to_radians(),
        }
    }

    fn from_gpx(waypoint: &gpx::Waypoint) -> Self {
        let point = waypoint.point();
        let mut trkpt = Self::new(point.x(), point.y(), waypoint.elevation);
        trkpt.time = waypoint.time.map(OffsetDateTime::from);
        trkpt
    }
}

/// An uninterrupted recording of track points
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

impl TrackSegment {
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Self { points }
    }
}

/// A track made of ordered segments
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    name: String,
    segments: Vec<TrackSegment>,
    /// Cached number of points across all segments
    total_points: usize,
    /// Cached number of visible points
    visible_points: usize,
    /// Cached total distance of the visible points in meters
    total_distance: f64,
    total_ascent: f64,
    total_descent: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Track {
    /// Create a track and derive its secondary data
    ///
    /// # Returns
    /// The track, or [`ProfileError::EmptyTrack`] if no segment holds a point
    pub fn new(name: impl Into<String>, segments: Vec<TrackSegment>) -> Result<Self> {
        let track = Self::from_segments(name.into(), segments);
        if track.total_points == 0 {
            return Err(ProfileError::EmptyTrack);
        }
        Ok(track)
    }

    fn from_segments(name: String, segments: Vec<TrackSegment>) -> Self {
        let mut track = Self {
            name,
            segments,
            total_points: 0,
            visible_points: 0,
            total_distance: 0.0,
            total_ascent: 0.0,
            total_descent: 0.0,
        };
        track.derive_secondary_data();
        track
    }

    /// Convert a single GPX track
    ///
    /// A GPX track without points is kept as an empty track; its profile has an
    /// empty GPS line.
    pub fn from_gpx_track(gpx_track: &gpx::Track) -> Self {
        let segments = gpx_track
            .segments
            .iter()
            .map(|seg| TrackSegment::new(seg.points.iter().map(TrackPoint::from_gpx).collect()))
            .collect();
        Self::from_segments(gpx_track.name.clone().unwrap_or_default(), segments)
    }

    /// Convert every track of a GPX document, keeping the document order
    pub fn from_gpx(gpx_data: &gpx::Gpx) -> Vec<Self> {
        gpx_data.tracks.iter().map(Self::from_gpx_track).collect()
    }

    /// Recompute indices, distances and statistics over all points
    ///
    /// Distance accumulates between consecutive visible points, also across segment
    /// boundaries. Slope and ascent/descent chain over visible points that carry an
    /// elevation; a point without elevation does not break the chain.
    fn derive_secondary_data(&mut self) {
        profiling::scope!("track::derive_secondary_data");

        let mut total_index = 0;
        let mut visible_index = 0;
        let mut distance = 0.0;
        let mut ascent = 0.0;
        let mut descent = 0.0;
        let mut prev_visible: Option<(Coord<f64>, Option<OffsetDateTime>)> = None;
        // Distance and elevation of the last visible point with elevation
        let mut prev_elevation: Option<(f64, f64)> = None;

        for trkpt in self.segments.iter_mut().flat_map(|seg| seg.points.iter_mut()) {
            trkpt.total_index = total_index;
            total_index += 1;

            if trkpt.hidden {
                trkpt.visible_index = None;
                trkpt.distance = distance;
                trkpt.delta_distance = 0.0;
                trkpt.speed = None;
                trkpt.slope = None;
                trkpt.ascent = ascent;
                trkpt.descent = descent;
                continue;
            }

            trkpt.visible_index = Some(visible_index);
            visible_index += 1;

            let (delta, speed) = match prev_visible {
                Some((prev_pos, prev_time)) => {
                    let delta = haversine_distance(prev_pos, trkpt.position);
                    let speed = match (prev_time, trkpt.time) {
                        (Some(t1), Some(t2)) => {
                            let seconds = (t2 - t1).as_seconds_f64();
                            (seconds > 0.0).then(|| delta / seconds)
                        }
                        _ => None,
                    };
                    (delta, speed)
                }
                None => (0.0, None),
            };
            distance += delta;
            prev_visible = Some((trkpt.position, trkpt.time));

            trkpt.slope = None;
            if let Some(ele) = trkpt.elevation {
                if let Some((prev_dist, prev_ele)) = prev_elevation {
                    let diff = ele - prev_ele;
                    if diff > 0.0 {
                        ascent += diff;
                    } else {
                        descent -= diff;
                    }
                    let run = distance - prev_dist;
                    if run > 0.0 {
                        trkpt.slope = Some(diff / run * 100.0);
                    }
                }
                prev_elevation = Some((distance, ele));
            }

            trkpt.distance = distance;
            trkpt.delta_distance = delta;
            trkpt.speed = speed;
            trkpt.ascent = ascent;
            trkpt.descent = descent;
        }

        self.total_points = total_index;
        self.visible_points = visible_index;
        self.total_distance = distance;
        self.total_ascent = ascent;
        self.total_descent = descent;
    }

    /// Hide the points whose total index falls in `range`
    pub fn hide_points(&mut self, range: Range<usize>) -> Result<()> {
        if range.end > self.total_points {
            return Err(ProfileError::PointIndex(range.end.saturating_sub(1)));
        }
        for trkpt in self.points_mut() {
            if range.contains(&trkpt.total_index) {
                trkpt.hidden = true;
            }
        }
        self.derive_secondary_data();
        Ok(())
    }

    /// Make every point visible again
    pub fn show_all_points(&mut self) {
        for trkpt in self.points_mut() {
            trkpt.hidden = false;
        }
        self.derive_secondary_data();
    }

    /// Attach (or detach with `None`) a waypoint to the point at `total_index`
    pub fn set_waypoint(&mut self, total_index: usize, key: Option<WaypointKey>) -> Result<()> {
        let trkpt = self
            .points_mut()
            .find(|p| p.total_index == total_index)
            .ok_or(ProfileError::PointIndex(total_index))?;
        trkpt.waypoint = key;
        Ok(())
    }

    /// Attach every project waypoint to its closest visible point
    ///
    /// Waypoints farther than `max_distance` meters from the track are ignored.
    ///
    /// # Returns
    /// The number of waypoints attached
    pub fn link_waypoints(&mut self, project: &Project, max_distance: f64) -> usize {
        let mut linked = 0;
        for wpt in project.waypoints() {
            let closest = self
                .points()
                .filter(|p| p.is_visible())
                .map(|p| (p.total_index, haversine_distance(p.position, wpt.position)))
                .filter(|(_, d)| *d <= max_distance)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((total_index, _)) = closest {
                if let Some(trkpt) = self.points_mut().find(|p| p.total_index == total_index) {
                    trkpt.waypoint = Some(wpt.key.clone());
                    linked += 1;
                }
            }
        }
        tracing::debug!("Linked {linked} waypoints to track {:?}", self.name);
        linked
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all segments
    #[inline]
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// Iterate over all points in track order
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.segments.iter().flat_map(|seg| seg.points.iter())
    }

    fn points_mut(&mut self) -> impl Iterator<Item = &mut TrackPoint> {
        self.segments.iter_mut().flat_map(|seg| seg.points.iter_mut())
    }

    /// Get a point by its total index
    pub fn point(&self, total_index: usize) -> Option<&TrackPoint> {
        self.points().nth(total_index)
    }

    /// Get total number of points, hidden ones included
    #[inline]
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    #[inline]
    pub fn visible_point_count(&self) -> usize {
        self.visible_points
    }

    /// Distance covered by the visible points in meters
    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    #[inline]
    pub fn total_ascent(&self) -> f64 {
        self.total_ascent
    }

    #[inline]
    pub fn total_descent(&self) -> f64 {
        self.total_descent
    }
}

/// Calculate the Haversine distance between two lon/lat positions in meters
#[inline]
pub(crate) fn haversine_distance(p1: Coord<f64>, p2: Coord<f64>) -> f64 {
    let lat1 = p1.y.to_radians();
    let lat2 = p2.y.to_radians();
    let delta_lat = (p2.y - p1.y).to_radians();
    let delta_lon = (p2.x - p1.x).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Waypoint;
    use gpx::{Gpx, TrackSegment as GpxSegment};
    use time::Duration;

    /// Meters per degree of longitude on the equator
    const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn equator_point(meters: f64, elevation: Option<f64>) -> TrackPoint {
        TrackPoint::new(meters / METERS_PER_DEGREE, 0.0, elevation)
    }

    fn create_test_track() -> Track {
        let first = TrackSegment::new(vec![
            equator_point(0.0, Some(100.0)),
            equator_point(100.0, Some(110.0)),
            equator_point(200.0, None),
        ]);
        let second = TrackSegment::new(vec![
            equator_point(300.0, Some(105.0)),
            equator_point(400.0, Some(125.0)),
        ]);
        Track::new("test", vec![first, second]).unwrap()
    }

    #[test]
    fn test_track_creation() {
        let track = create_test_track();
        assert_eq!(track.name(), "test");
        assert_eq!(track.total_points(), 5);
        assert_eq!(track.visible_point_count(), 5);
        assert_eq!(track.segments().len(), 2);
    }

    #[test]
    fn test_empty_track_fails() {
        assert!(matches!(
            Track::new("empty", vec![TrackSegment::default()]),
            Err(ProfileError::EmptyTrack)
        ));
    }

    #[test]
    fn test_distance_accumulates_across_segments() {
        let track = create_test_track();
        let distances: Vec<f64> = track.points().map(|p| p.distance).collect();
        for (i, d) in distances.iter().enumerate() {
            assert!((d - i as f64 * 100.0).abs() < 1e-6, "point {i}: {d}");
        }
        assert!((track.total_distance() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_elevation_keeps_chain() {
        let track = create_test_track();
        // 100 -> 110 (+10), gap, 110 -> 105 (-5), 105 -> 125 (+20)
        assert!((track.total_ascent() - 30.0).abs() < 1e-9);
        assert!((track.total_descent() - 5.0).abs() < 1e-9);

        let after_gap = track.point(3).unwrap();
        // -5 m over 200 m since the last point with elevation
        assert!((after_gap.slope.unwrap() + 2.5).abs() < 1e-6);
        assert!(track.point(2).unwrap().slope.is_none());
    }

    #[test]
    fn test_hidden_points_get_no_visible_index() {
        let mut track = create_test_track();
        track.hide_points(1..3).unwrap();

        assert_eq!(track.visible_point_count(), 3);
        let visible: Vec<Option<usize>> = track.points().map(|p| p.visible_index).collect();
        assert_eq!(visible, vec![Some(0), None, None, Some(1), Some(2)]);

        // Distance jumps straight from the first to the fourth point
        let fourth = track.point(3).unwrap();
        assert!((fourth.delta_distance - 300.0).abs() < 1e-6);
        assert!((track.total_distance() - 400.0).abs() < 1e-6);

        track.show_all_points();
        assert_eq!(track.visible_point_count(), 5);
    }

    #[test]
    fn test_hide_out_of_range_fails() {
        let mut track = create_test_track();
        assert!(track.hide_points(3..10).is_err());
        assert_eq!(track.visible_point_count(), 5);
    }

    #[test]
    fn test_speed_from_time() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let segment = TrackSegment::new(vec![
            equator_point(0.0, None).with_time(start),
            equator_point(100.0, None).with_time(start + Duration::seconds(20)),
            equator_point(200.0, None),
        ]);
        let track = Track::new("timed", vec![segment]).unwrap();

        assert!(track.point(0).unwrap().speed.is_none());
        assert!((track.point(1).unwrap().speed.unwrap() - 5.0).abs() < 1e-6);
        assert!(track.point(2).unwrap().speed.is_none());
    }

    #[test]
    fn test_set_waypoint() {
        let mut track = create_test_track();
        track.set_waypoint(2, Some(WaypointKey::new("hut"))).unwrap();
        assert_eq!(
            track.point(2).unwrap().waypoint,
            Some(WaypointKey::new("hut"))
        );
        assert!(track.set_waypoint(99, None).is_err());
    }

    #[test]
    fn test_link_waypoints() {
        let mut track = create_test_track();
        let mut project = Project::new("project");
        project.add_waypoint(Waypoint::new("near", "Near", 310.0 / METERS_PER_DEGREE, 0.0));
        project.add_waypoint(Waypoint::new("far", "Far", 0.0, 1.0));

        assert_eq!(track.link_waypoints(&project, 50.0), 1);
        assert_eq!(
            track.point(3).unwrap().waypoint,
            Some(WaypointKey::new("near"))
        );
    }

    #[test]
    fn test_from_gpx() {
        let mut gpx_data = Gpx::default();
        let mut gpx_track = gpx::Track::default();
        gpx_track.name = Some("Morning ride".to_string());
        let mut segment = GpxSegment::default();
        for i in 0..3 {
            let mut wpt = gpx::Waypoint::new(geo::Point::new(-0.1278 + i as f64 * 0.001, 51.5074));
            wpt.elevation = Some(20.0 + i as f64);
            segment.points.push(wpt);
        }
        gpx_track.segments.push(segment);
        gpx_data.tracks.push(gpx_track);

        let tracks = Track::from_gpx(&gpx_data);
        assert_eq!(tracks.len(), 1);
        let track = tracks.into_iter().next().unwrap();
        assert_eq!(track.name(), "Morning ride");
        assert_eq!(track.total_points(), 3);
        assert_eq!(track.point(2).unwrap().elevation, Some(22.0));
        assert!(track.total_distance() > 100.0);
        assert!(track.total_distance() < 200.0);
    }

    #[test]
    fn test_haversine_distance() {
        let london = Coord { x: -0.1278, y: 51.5074 };
        let paris = Coord { x: 2.3522, y: 48.8566 };
        let d = haversine_distance(london, paris);
        assert!((d - 343_500.0).abs() < 1_000.0);
    }
}
