//! Profile and table writers

use crate::CliError;
use serde::Serialize;
use std::io::Write;
use track_profile_lib::{PointRow, ProfileDataset};

/// One CSV row per plotted vertex
#[derive(Serialize)]
struct VertexRow<'a> {
    track: &'a str,
    series: &'a str,
    distance: f64,
    elevation: f64,
}

/// Point table of one track
#[derive(Serialize)]
pub struct TrackTable<'a> {
    pub track: &'a str,
    pub points: &'a [PointRow],
}

/// CSV form of a [`PointRow`] with the owning track
#[derive(Serialize)]
struct TableRow<'a> {
    track: &'a str,
    index: usize,
    visible: bool,
    time: &'a str,
    elevation: &'a str,
    delta_distance: &'a str,
    distance: &'a str,
    speed: &'a str,
    slope: &'a str,
    ascent: &'a str,
    descent: &'a str,
    waypoint: &'a str,
}

impl<'a> TableRow<'a> {
    fn new(track: &'a str, row: &'a PointRow) -> Self {
        Self {
            track,
            index: row.index,
            visible: row.visible,
            time: &row.time,
            elevation: &row.elevation,
            delta_distance: &row.delta_distance,
            distance: &row.distance,
            speed: &row.speed,
            slope: &row.slope,
            ascent: &row.ascent,
            descent: &row.descent,
            waypoint: &row.waypoint,
        }
    }
}

pub fn write_json<W: Write>(datasets: &[ProfileDataset], mut writer: W) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut writer, datasets)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write every line vertex as `track,series,distance,elevation`
pub fn write_csv<W: Write>(datasets: &[ProfileDataset], writer: W) -> Result<(), CliError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for dataset in datasets {
        for line in &dataset.lines {
            for vertex in &line.points {
                csv_writer.serialize(VertexRow {
                    track: &dataset.title,
                    series: &line.label,
                    distance: vertex.x,
                    elevation: vertex.y,
                })?;
            }
        }
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_tables_json<W: Write>(tables: &[TrackTable<'_>], mut writer: W) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut writer, tables)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn write_tables_csv<W: Write>(tables: &[TrackTable<'_>], writer: W) -> Result<(), CliError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for table in tables {
        for row in table.points {
            csv_writer.serialize(TableRow::new(table.track, row))?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use track_profile_lib::{PlotLine, PlotMode};

    fn create_test_dataset() -> ProfileDataset {
        ProfileDataset {
            title: "ridge".to_string(),
            mode: PlotMode::Normal,
            lines: vec![
                PlotLine {
                    label: "GPS".to_string(),
                    points: vec![Coord { x: 0.0, y: 100.0 }, Coord { x: 50.0, y: 110.5 }],
                },
                PlotLine {
                    label: "spline".to_string(),
                    points: vec![Coord { x: 0.0, y: 101.0 }],
                },
            ],
            x_label: "distance [m]".to_string(),
            y_label: "alt. [m]".to_string(),
            x_tic_scale: 1.0,
            base_factor: 1.0,
            ..Default::default()
        }
    }

    fn create_test_row() -> PointRow {
        PointRow {
            index: 0,
            visible: true,
            time: "-".to_string(),
            elevation: "100 m".to_string(),
            delta_distance: "0.00 m".to_string(),
            distance: "0.00 m".to_string(),
            speed: "-".to_string(),
            slope: "-".to_string(),
            ascent: "0 m".to_string(),
            descent: "0 m".to_string(),
            waypoint: String::new(),
        }
    }

    #[test]
    fn test_csv_rows() {
        let mut out = Vec::new();
        write_csv(&[create_test_dataset()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "track,series,distance,elevation",
                "ridge,GPS,0.0,100.0",
                "ridge,GPS,50.0,110.5",
                "ridge,spline,0.0,101.0",
            ]
        );
    }

    #[test]
    fn test_json_array() {
        let mut out = Vec::new();
        write_json(&[create_test_dataset()], &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let datasets = value.as_array().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0]["title"], "ridge");
        assert_eq!(datasets[0]["mode"], "normal");
        assert_eq!(datasets[0]["lines"][0]["points"][1]["y"], 110.5);
    }

    #[test]
    fn test_table_csv() {
        let rows = vec![create_test_row()];
        let tables = [TrackTable {
            track: "ridge",
            points: &rows,
        }];
        let mut out = Vec::new();
        write_tables_csv(&tables, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "track,index,visible,time,elevation,delta_distance,distance,speed,slope,ascent,descent,waypoint"
            )
        );
        assert_eq!(lines.next(), Some("ridge,0,true,-,100 m,0.00 m,0.00 m,-,-,0 m,0 m,"));
    }

    #[test]
    fn test_table_json() {
        let rows = vec![create_test_row()];
        let tables = [TrackTable {
            track: "ridge",
            points: &rows,
        }];
        let mut out = Vec::new();
        write_tables_json(&tables, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["points"][0]["elevation"], "100 m");
    }
}
