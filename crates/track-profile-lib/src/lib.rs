//! Track Profile Library - Elevation Profiles for GPS Tracks
//!
//! This library turns a recorded GPS track into a renderable elevation profile. Three
//! series are produced for every track: the elevation measured by the GPS receiver, the
//! terrain elevation sampled from a digital elevation model (DEM) and a smoothed cubic
//! spline fitted through the GPS elevation.
//!
//! # Architecture
//!
//! - **[`Track`]**: Segmented track points with derived distance, speed and slope data
//! - **[`select_points`]**: Filters hidden points and points without elevation
//! - **[`ElevationLookup`]**: Terrain elevation provider ([`AsciiGrid`], [`NoTerrain`])
//! - **[`fit_cubic`]**: Penalized cubic B-spline least squares fit
//! - **[`build_profile`]**: Pipeline assembling a [`ProfileDataset`]
//! - **[`ProfileView`]**: Cached dataset with cheap limit and mouse focus updates
//!
//! # Pipeline
//!
//! Every rebuild runs strictly in order: filter → terrain lookup → spline fit → assemble.
//! The resulting dataset only depends on the track, the terrain data, the limit and the
//! plot mode, so identical inputs yield identical datasets.

mod config;
mod elevation;
mod filter;
mod limit;
mod profile;
mod project;
mod spline;
mod table;
mod track;
pub mod units;

// Public API exports
pub use config::ProfileConfig;
pub use elevation::{AsciiGrid, ElevationLookup, ElevationSample, ElevationSeries, NoTerrain};
pub use filter::{PointTag, TrackSamples, select_points};
pub use limit::{Limit, LimitMode};
pub use profile::{
    AxisRange, Collaborators, PlotLine, PlotMode, ProfileDataset, ProfileView,
    SharedProfileView, build_profile, build_profiles,
};
pub use project::{Project, Waypoint, WaypointKey, WaypointResolver};
pub use spline::{CubicSpline, FitError, fit_cubic};
pub use table::{PointRow, point_table};
pub use track::{Track, TrackPoint, TrackSegment};
pub use units::{UnitConverter, UnitSystem};

/// Error types for the profile library
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty track")]
    EmptyTrack,

    #[error("Spline fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("Elevation lookup returned {actual} samples for {expected} coordinates")]
    ElevationLookupMismatch { expected: usize, actual: usize },

    #[error("DEM parsing error: {0}")]
    DemParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Point index {0} is out of range")]
    PointIndex(usize),

    #[error("A profile rebuild is already in progress")]
    RebuildInProgress,
}

pub type Result<T> = std::result::Result<T, ProfileError>;
