//! Profile assembly - filter, terrain lookup, spline fit and the renderable dataset
//!
//! This module provides the high-level API: [`build_profile`] runs the whole pipeline for
//! one track, [`build_profiles`] for many tracks in parallel, and [`ProfileView`] keeps
//! the last dataset around so limit and mouse focus changes need no recomputation.

use crate::{
    ElevationLookup, ElevationSeries, Limit, PointTag, ProfileConfig, ProfileError, Result,
    Track, TrackPoint, TrackSamples, UnitConverter, WaypointResolver, fit_cubic, select_points,
};
use geo::Coord;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, TryLockError};

/// Label of the elevation line recorded by the GPS receiver
pub const GPS_LINE: &str = "GPS";
/// Label of the terrain elevation line
pub const DEM_LINE: &str = "DEM";
/// Label of the fitted curve
pub const SPLINE_LINE: &str = "spline";

/// How the profile is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlotMode {
    /// Full size plot with axis labels and waypoint tags
    #[default]
    Normal,
    /// Compact thumbnail labelled with the track name, without tags
    Icon,
}

/// One named polyline in profile coordinates (distance, elevation)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlotLine {
    pub label: String,
    pub points: Vec<Coord<f64>>,
}

impl PlotLine {
    fn new(label: &str, points: Vec<Coord<f64>>) -> Self {
        Self {
            label: label.to_string(),
            points,
        }
    }
}

/// Closed value range of an axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// Everything needed to draw a profile
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileDataset {
    /// Track name
    pub title: String,
    pub mode: PlotMode,
    /// GPS line first, then DEM (only with terrain data) and spline (only with samples)
    pub lines: Vec<PlotLine>,
    pub tags: Vec<PointTag>,
    pub x_label: String,
    pub y_label: String,
    /// Factor from meters to the distance unit named in `x_label`
    pub x_tic_scale: f64,
    /// Factor from meters to the elevation unit of the lines
    pub base_factor: f64,
    /// Knot count of the fitted spline
    pub spline_knots: Option<usize>,
    pub x_range: Option<AxisRange>,
    /// Elevation range of the lines
    pub data_y_range: Option<AxisRange>,
    /// Elevation range to display, after applying the limit
    pub y_range: Option<AxisRange>,
}

impl ProfileDataset {
    /// Get a line by label
    pub fn line(&self, label: &str) -> Option<&PlotLine> {
        self.lines.iter().find(|l| l.label == label)
    }

    /// Re-resolve the displayed elevation range from the cached data range
    pub fn apply_limit(&mut self, limit: &Limit) {
        self.y_range = match self.data_y_range {
            Some(data) => {
                let (min, max) = limit.apply(data.min, data.max);
                Some(AxisRange { min, max })
            }
            None => match (limit.min(), limit.max()) {
                (Some(min), Some(max)) => Some(AxisRange { min, max }),
                _ => None,
            },
        };
    }
}

/// External services used while building a profile
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub units: &'a dyn UnitConverter,
    pub terrain: &'a dyn ElevationLookup,
    /// Source of waypoint names and icons, usually the project owning the track
    pub waypoints: Option<&'a dyn WaypointResolver>,
}

impl<'a> Collaborators<'a> {
    pub fn new(units: &'a dyn UnitConverter, terrain: &'a dyn ElevationLookup) -> Self {
        Self {
            units,
            terrain,
            waypoints: None,
        }
    }

    pub fn with_waypoints(mut self, waypoints: &'a dyn WaypointResolver) -> Self {
        self.waypoints = Some(waypoints);
        self
    }
}

/// Build the profile of `track`
///
/// Runs filter → terrain lookup → spline fit → assembly. A track without visible points
/// carrying an elevation yields an empty GPS line and no spline; this is not an error.
///
/// # Returns
/// The dataset, or an error if the configuration is invalid, the terrain lookup broke
/// its contract or the spline fit failed on non-empty samples
pub fn build_profile(
    track: &Track,
    limit: &Limit,
    mode: PlotMode,
    collaborators: &Collaborators<'_>,
    config: &ProfileConfig,
) -> Result<ProfileDataset> {
    profiling::scope!("profile::build_profile");

    config.validate()?;
    let base_factor = collaborators.units.base_factor();
    let samples = select_points(track, base_factor, collaborators.waypoints, mode);
    let terrain = ElevationSeries::lookup(collaborators.terrain, &samples)?;

    let spline = if samples.is_empty() {
        None
    } else {
        let knots = config.knot_count(samples.len());
        let spline = fit_cubic(&samples.distances, &samples.elevations, knots, config.smoothing)?;
        Some((knots, spline.resample(track.total_distance(), samples.len())))
    };

    tracing::debug!(
        "Profile of {:?}: {} samples, terrain data: {}, spline knots: {:?}",
        track.name(),
        samples.len(),
        terrain.has_data(),
        spline.as_ref().map(|(knots, _)| *knots)
    );

    Ok(assemble(
        track,
        samples,
        &terrain,
        spline,
        limit,
        mode,
        collaborators.units,
    ))
}

/// Combine the pipeline results into a dataset
fn assemble(
    track: &Track,
    samples: TrackSamples,
    terrain: &ElevationSeries,
    spline: Option<(usize, Vec<Coord<f64>>)>,
    limit: &Limit,
    mode: PlotMode,
    units: &dyn UnitConverter,
) -> ProfileDataset {
    let base_factor = units.base_factor();
    let (x_tic_scale, distance_unit) = units.axis_scale(track.total_distance());
    let (x_label, y_label) = match mode {
        PlotMode::Normal => (
            format!("distance [{distance_unit}]"),
            format!("alt. [{}]", units.base_unit()),
        ),
        PlotMode::Icon => (track.name().to_string(), String::new()),
    };

    let mut lines = vec![PlotLine::new(GPS_LINE, samples.line)];
    if terrain.has_data() {
        lines.push(PlotLine::new(DEM_LINE, terrain.line(base_factor)));
    }
    let spline_knots = spline.map(|(knots, points)| {
        lines.push(PlotLine::new(SPLINE_LINE, points));
        knots
    });

    let mut dataset = ProfileDataset {
        title: track.name().to_string(),
        mode,
        x_range: data_range(&lines, |c| c.x),
        data_y_range: data_range(&lines, |c| c.y),
        lines,
        tags: samples.tags,
        x_label,
        y_label,
        x_tic_scale,
        base_factor,
        spline_knots,
        y_range: None,
    };
    dataset.apply_limit(limit);
    dataset
}

fn data_range(lines: &[PlotLine], value: impl Fn(&Coord<f64>) -> f64) -> Option<AxisRange> {
    lines
        .iter()
        .flat_map(|l| l.points.iter())
        .map(value)
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some(AxisRange { min: v, max: v }),
            Some(r) => Some(AxisRange {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
}

/// Build the profiles of several tracks in parallel
///
/// Each profile is built sequentially; results keep the order of `tracks`.
pub fn build_profiles(
    tracks: &[Track],
    limit: &Limit,
    mode: PlotMode,
    collaborators: &Collaborators<'_>,
    config: &ProfileConfig,
) -> Vec<Result<ProfileDataset>> {
    profiling::scope!("profile::build_profiles");

    tracks
        .par_iter()
        .map(|track| build_profile(track, limit, mode, collaborators, config))
        .collect()
}

/// Profile state kept between user interactions
///
/// Owns the last dataset; [`Self::set_limits`] and [`Self::set_mouse_focus`] only touch
/// that cached state, while [`Self::rebuild`] recomputes everything.
#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    config: ProfileConfig,
    mode: PlotMode,
    limit: Limit,
    dataset: ProfileDataset,
    /// Focused point in profile coordinates
    focus: Option<Coord<f64>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ProfileView {
    pub fn new(config: ProfileConfig, mode: PlotMode, limit: Limit) -> Self {
        Self {
            config,
            mode,
            limit,
            dataset: ProfileDataset::default(),
            focus: None,
        }
    }

    /// Replace the dataset with a fresh build of `track`
    ///
    /// On error the previous dataset stays in place.
    pub fn rebuild(
        &mut self,
        track: &Track,
        collaborators: &Collaborators<'_>,
    ) -> Result<&ProfileDataset> {
        let dataset = build_profile(track, &self.limit, self.mode, collaborators, &self.config)?;
        self.dataset = dataset;
        self.focus = None;
        Ok(&self.dataset)
    }

    /// Apply a new limit to the cached dataset
    pub fn set_limits(&mut self, limit: Limit) {
        self.limit = limit;
        self.dataset.apply_limit(&self.limit);
    }

    /// Move the focus marker to `point`, or remove it with `None`
    ///
    /// Hidden points and points without elevation can not be focused, nor can anything
    /// before the first successful rebuild.
    ///
    /// # Returns
    /// Whether the focus changed and the profile needs a redraw
    pub fn set_mouse_focus(&mut self, point: Option<&TrackPoint>) -> bool {
        let focus = point
            .filter(|p| p.is_visible() && !self.dataset.lines.is_empty())
            .and_then(|p| {
                p.elevation.map(|ele| Coord {
                    x: p.distance,
                    y: ele * self.dataset.base_factor,
                })
            });
        let changed = focus != self.focus;
        self.focus = focus;
        changed
    }

    #[inline]
    pub fn mouse_focus(&self) -> Option<Coord<f64>> {
        self.focus
    }

    #[inline]
    pub fn dataset(&self) -> &ProfileDataset {
        &self.dataset
    }

    #[inline]
    pub fn limit(&self) -> &Limit {
        &self.limit
    }

    #[inline]
    pub fn mode(&self) -> PlotMode {
        self.mode
    }

    /// Change the plot mode; takes effect on the next rebuild
    pub fn set_mode(&mut self, mode: PlotMode) {
        self.mode = mode;
    }
}

/// A [`ProfileView`] shared between threads with at most one rebuild in flight
#[derive(Debug, Default)]
pub struct SharedProfileView {
    inner: Mutex<ProfileView>,
}

impl SharedProfileView {
    pub fn new(view: ProfileView) -> Self {
        Self {
            inner: Mutex::new(view),
        }
    }

    /// Rebuild the view unless another rebuild or access is in progress
    ///
    /// # Returns
    /// [`ProfileError::RebuildInProgress`] instead of waiting when the view is busy
    pub fn rebuild(&self, track: &Track, collaborators: &Collaborators<'_>) -> Result<()> {
        let mut view = match self.inner.try_lock() {
            Ok(view) => view,
            Err(TryLockError::WouldBlock) => return Err(ProfileError::RebuildInProgress),
            Err(TryLockError::Poisoned(poisoned)) => {
                tracing::warn!("Profile view lock poisoned by a panicked thread, recovering");
                poisoned.into_inner()
            }
        };
        view.rebuild(track, collaborators).map(|_| ())
    }

    /// Run `f` with exclusive access to the view, waiting for a running rebuild
    pub fn with_view<R>(&self, f: impl FnOnce(&mut ProfileView) -> R) -> R {
        let mut view = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| {
                tracing::warn!("Profile view lock poisoned by a panicked thread, recovering");
                poisoned.into_inner()
            });
        f(&mut view)
    }
}

impl fmt::Display for PlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Icon => "icon",
        })
    }
}

impl FromStr for PlotMode {
    type Err = ProfileError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "icon" => Ok(Self::Icon),
            _ => Err(ProfileError::UnknownVariant {
                kind: "plot mode",
                value: s.to_string(),
            }),
        }
    }
}
