//! Projects group the tracks and waypoints loaded from one GPX document

use crate::{Result, Track};
use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Key identifying a waypoint inside its project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaypointKey(pub String);

impl WaypointKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WaypointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named point of interest
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Waypoint {
    pub key: WaypointKey,
    pub name: String,
    /// Symbol name used to pick an icon
    pub icon: Option<String>,
    /// Longitude / latitude in degrees
    pub position: Coord<f64>,
    pub elevation: Option<f64>,
}

impl Waypoint {
    pub fn new(key: impl Into<String>, name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            key: WaypointKey::new(key),
            name: name.into(),
            icon: None,
            position: Coord { x: lon, y: lat },
            elevation: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Resolves waypoint keys referenced by track points
pub trait WaypointResolver: Send + Sync {
    fn resolve_waypoint(&self, key: &WaypointKey) -> Option<&Waypoint>;
}

/// Tracks and waypoints of one document
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub name: String,
    waypoints: Vec<Waypoint>,
    /// Waypoint position by key
    index: HashMap<WaypointKey, usize>,
    pub tracks: Vec<Track>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Project {
    /// Create an empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build a project from parsed GPX data
    ///
    /// Waypoints are keyed by their position in the document. Empty tracks are skipped.
    pub fn from_gpx(name: impl Into<String>, gpx_data: &gpx::Gpx) -> Self {
        let mut project = Self::new(name);
        for (i, wpt) in gpx_data.waypoints.iter().enumerate() {
            let point = wpt.point();
            project.add_waypoint(Waypoint {
                key: WaypointKey(format!("wpt-{i}")),
                name: wpt.name.clone().unwrap_or_else(|| format!("Waypoint {}", i + 1)),
                icon: wpt.symbol.clone(),
                position: Coord {
                    x: point.x(),
                    y: point.y(),
                },
                elevation: wpt.elevation,
            });
        }
        project.tracks = Track::from_gpx(gpx_data);
        let empty = project.tracks.iter().filter(|t| t.total_points() == 0).count();
        if empty > 0 {
            tracing::warn!("{empty} tracks without points in {:?}", project.name);
        }
        project
    }

    /// Load a project from a GPX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let gpx_data = gpx::read(reader)?;
        let name = gpx_data
            .metadata
            .as_ref()
            .and_then(|m| m.name.clone())
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();
        let project = Self::from_gpx(name, &gpx_data);
        tracing::debug!(
            "Loaded project {:?}: {} tracks, {} waypoints",
            project.name,
            project.tracks.len(),
            project.waypoints.len()
        );
        Ok(project)
    }

    /// Add or replace a waypoint
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        match self.index.get(&waypoint.key) {
            Some(&i) => self.waypoints[i] = waypoint,
            None => {
                self.index.insert(waypoint.key.clone(), self.waypoints.len());
                self.waypoints.push(waypoint);
            }
        }
    }

    /// All waypoints in insertion order
    #[inline]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

impl WaypointResolver for Project {
    fn resolve_waypoint(&self, key: &WaypointKey) -> Option<&Waypoint> {
        self.index.get(key).and_then(|&i| self.waypoints.get(i))
    }
}
