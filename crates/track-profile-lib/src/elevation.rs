//! Terrain elevation lookup
//!
//! The profile compares the elevation recorded by the GPS receiver with the elevation
//! of the terrain below it. Terrain data comes from an [`ElevationLookup`]
//! implementation; [`AsciiGrid`] reads ESRI ASCII grid DEM files.

use crate::{ProfileError, Result, TrackSamples};
use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

/// Provides terrain elevations for positions
pub trait ElevationLookup: Send + Sync {
    /// Look up the terrain elevation in meters for each coordinate
    ///
    /// Coordinates are longitude / latitude in radians. The result must have the same
    /// length and order as `coords`; `None` marks positions without terrain data.
    fn elevations_at(&self, coords: &[Coord<f64>]) -> Vec<Option<f64>>;
}

/// Lookup used when no terrain data is available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl ElevationLookup for NoTerrain {
    fn elevations_at(&self, coords: &[Coord<f64>]) -> Vec<Option<f64>> {
        vec![None; coords.len()]
    }
}

/// Terrain elevation at one profile distance
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElevationSample {
    pub distance: f64,
    /// Terrain elevation in meters
    pub elevation: Option<f64>,
}

/// Terrain elevations aligned with the filtered track samples
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElevationSeries {
    pub samples: Vec<ElevationSample>,
}

impl ElevationSeries {
    /// Query `lookup` for every filtered sample
    ///
    /// # Returns
    /// The series, or [`ProfileError::ElevationLookupMismatch`] if the lookup broke the
    /// one result per coordinate contract
    pub fn lookup(lookup: &dyn ElevationLookup, samples: &TrackSamples) -> Result<Self> {
        profiling::scope!("elevation::lookup");

        let elevations = lookup.elevations_at(&samples.coords);
        if elevations.len() != samples.coords.len() {
            return Err(ProfileError::ElevationLookupMismatch {
                expected: samples.coords.len(),
                actual: elevations.len(),
            });
        }

        let samples = samples
            .distances
            .iter()
            .zip(elevations)
            .map(|(&distance, elevation)| ElevationSample {
                distance,
                elevation,
            })
            .collect();
        Ok(Self { samples })
    }

    /// Whether at least one sample carries terrain data
    pub fn has_data(&self) -> bool {
        self.samples.iter().any(|s| s.elevation.is_some())
    }

    /// Renderable (distance, elevation × `base_factor`) vertices, gaps dropped
    pub fn line(&self, base_factor: f64) -> Vec<Coord<f64>> {
        self.samples
            .iter()
            .filter_map(|s| {
                s.elevation.map(|ele| Coord {
                    x: s.distance,
                    y: ele * base_factor,
                })
            })
            .collect()
    }
}

/// Raster DEM in ESRI ASCII grid format
///
/// Cell values are elevations in meters on a regular longitude / latitude grid in
/// degrees. Rows are stored north to south.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiGrid {
    ncols: usize,
    nrows: usize,
    /// Longitude of the western grid edge
    west: f64,
    /// Latitude of the southern grid edge
    south: f64,
    cell_size: f64,
    cells: Vec<Option<f64>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl AsciiGrid {
    /// Load a grid from a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse a grid
    ///
    /// The header must provide `ncols`, `nrows`, `xllcorner` or `xllcenter`,
    /// `yllcorner` or `yllcenter` and `cellsize`; `NODATA_value` is optional.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut ncols = None;
        let mut nrows = None;
        let mut x_corner = None;
        let mut y_corner = None;
        let mut x_center = None;
        let mut y_center = None;
        let mut cell_size = None;
        let mut nodata = None;
        let mut values = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let starts_alpha = trimmed
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic());
            if starts_alpha && values.is_empty() {
                let mut parts = trimmed.split_whitespace();
                let key = parts.next().unwrap_or_default().to_ascii_lowercase();
                let value = parts
                    .next()
                    .ok_or_else(|| dem_error(format!("missing value for header {key}")))?;
                match key.as_str() {
                    "ncols" => ncols = Some(parse_number::<usize>(&key, value)?),
                    "nrows" => nrows = Some(parse_number::<usize>(&key, value)?),
                    "xllcorner" => x_corner = Some(parse_number::<f64>(&key, value)?),
                    "yllcorner" => y_corner = Some(parse_number::<f64>(&key, value)?),
                    "xllcenter" => x_center = Some(parse_number::<f64>(&key, value)?),
                    "yllcenter" => y_center = Some(parse_number::<f64>(&key, value)?),
                    "cellsize" => cell_size = Some(parse_number::<f64>(&key, value)?),
                    "nodata_value" => nodata = Some(parse_number::<f64>(&key, value)?),
                    _ => return Err(dem_error(format!("unknown header {key}"))),
                }
                continue;
            }

            for token in trimmed.split_whitespace() {
                values.push(parse_number::<f64>("cell", token)?);
            }
        }

        let ncols = ncols.ok_or_else(|| dem_error("missing ncols".to_string()))?;
        let nrows = nrows.ok_or_else(|| dem_error("missing nrows".to_string()))?;
        let cell_size = cell_size.ok_or_else(|| dem_error("missing cellsize".to_string()))?;
        if ncols == 0 || nrows == 0 {
            return Err(dem_error("grid has no cells".to_string()));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(dem_error(format!("invalid cellsize {cell_size}")));
        }
        let west = x_corner
            .or_else(|| x_center.map(|x| x - cell_size / 2.0))
            .ok_or_else(|| dem_error("missing xllcorner".to_string()))?;
        let south = y_corner
            .or_else(|| y_center.map(|y| y - cell_size / 2.0))
            .ok_or_else(|| dem_error("missing yllcorner".to_string()))?;
        let cell_count = ncols
            .checked_mul(nrows)
            .ok_or_else(|| dem_error(format!("grid of {ncols} x {nrows} cells is too large")))?;
        if values.len() != cell_count {
            return Err(dem_error(format!(
                "expected {cell_count} cells, found {}",
                values.len()
            )));
        }

        let cells = values
            .into_iter()
            .map(|v| (Some(v) != nodata && v.is_finite()).then_some(v))
            .collect();

        Ok(Self {
            ncols,
            nrows,
            west,
            south,
            cell_size,
            cells,
        })
    }

    #[inline]
    fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells[row * self.ncols + col]
    }

    /// Terrain elevation at `lon`/`lat` degrees
    ///
    /// Interpolates bilinearly between the four surrounding cell centres. If one of
    /// them has no data the nearest cell is used instead.
    pub fn elevation_at_degrees(&self, lon: f64, lat: f64) -> Option<f64> {
        let east = self.west + self.ncols as f64 * self.cell_size;
        let north = self.south + self.nrows as f64 * self.cell_size;
        if !(lon >= self.west && lon <= east && lat >= self.south && lat <= north) {
            return None;
        }

        // Fractional column / row of the cell centres, row 0 at the north edge
        let fx = ((lon - self.west) / self.cell_size - 0.5).clamp(0.0, (self.ncols - 1) as f64);
        let fy = ((north - lat) / self.cell_size - 0.5).clamp(0.0, (self.nrows - 1) as f64);

        let col0 = fx.floor() as usize;
        let row0 = fy.floor() as usize;
        let col1 = (col0 + 1).min(self.ncols - 1);
        let row1 = (row0 + 1).min(self.nrows - 1);
        let tx = fx - col0 as f64;
        let ty = fy - row0 as f64;

        match (
            self.cell(row0, col0),
            self.cell(row0, col1),
            self.cell(row1, col0),
            self.cell(row1, col1),
        ) {
            (Some(v00), Some(v01), Some(v10), Some(v11)) => {
                let top = v00 + (v01 - v00) * tx;
                let bottom = v10 + (v11 - v10) * tx;
                Some(top + (bottom - top) * ty)
            }
            _ => {
                let col = if tx < 0.5 { col0 } else { col1 };
                let row = if ty < 0.5 { row0 } else { row1 };
                self.cell(row, col)
            }
        }
    }
}

impl ElevationLookup for AsciiGrid {
    fn elevations_at(&self, coords: &[Coord<f64>]) -> Vec<Option<f64>> {
        let elevations: Vec<Option<f64>> = coords
            .iter()
            .map(|c| self.elevation_at_degrees(c.x.to_degrees(), c.y.to_degrees()))
            .collect();
        let missing = elevations.iter().filter(|e| e.is_none()).count();
        if missing > 0 {
            tracing::warn!(
                "DEM has no data for {missing} of {} positions",
                coords.len()
            );
        }
        elevations
    }
}

fn dem_error(message: String) -> ProfileError {
    ProfileError::DemParse(message)
}

fn parse_number<T: std::str::FromStr>(what: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| dem_error(format!("invalid {what} value {value:?}")))
}
