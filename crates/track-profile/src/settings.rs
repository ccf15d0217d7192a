use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use track_profile_lib::{Limit, LimitMode, PlotMode, ProfileConfig, ProfileError, UnitSystem};

/// Output encoding
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON array of datasets
    #[default]
    Json,
    /// Flat `track,series,distance,elevation` rows
    Csv,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Track Profile - Elevation profiles (GPS, DEM and spline) for GPX tracks
pub struct Settings {
    /// GPX files to load
    #[clap(short, long, value_name = "FILE", required = true, num_args = 1..)]
    pub gpx_files: Vec<PathBuf>,

    /// Only profile the track with this index, counted over all files
    #[clap(short, long)]
    pub track: Option<usize>,

    /// Plot mode: normal or icon
    #[clap(short, long, default_value = "normal", value_parser = parse_plot_mode)]
    pub mode: PlotMode,

    /// Unit system: metric, imperial or nautical
    #[clap(
        short,
        long,
        env = "TRACK_PROFILE_UNITS",
        default_value = "metric",
        value_parser = parse_units
    )]
    pub units: UnitSystem,

    /// Elevation axis limit: auto, user or sys
    #[clap(long, default_value = "auto", value_parser = parse_limit_mode)]
    pub limit_mode: LimitMode,

    /// Lower elevation bound in user limit mode
    #[clap(long, allow_negative_numbers = true)]
    pub limit_min: Option<f64>,

    /// Upper elevation bound in user limit mode
    #[clap(long, allow_negative_numbers = true)]
    pub limit_max: Option<f64>,

    /// Lower elevation bound in sys limit mode
    #[clap(long, allow_negative_numbers = true)]
    pub sys_min: Option<f64>,

    /// Upper elevation bound in sys limit mode
    #[clap(long, allow_negative_numbers = true)]
    pub sys_max: Option<f64>,

    /// ESRI ASCII grid with terrain elevations (longitude / latitude degrees)
    #[clap(long, env = "TRACK_PROFILE_DEM", value_name = "FILE")]
    pub dem: Option<PathBuf>,

    /// Samples per spline knot
    #[clap(long, default_value = "32")]
    pub points_per_knot: usize,

    /// Raise the knot count of short tracks to at least this many knots
    #[clap(long)]
    pub min_knots: Option<usize>,

    /// Spline smoothing weight (0 = plain least squares)
    #[clap(long, default_value = "0.001")]
    pub smoothing: f64,

    /// Attach project waypoints closer than this many meters to track points
    #[clap(long)]
    pub waypoint_radius: Option<f64>,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write the per-point statistics table instead of the profiles
    #[clap(long, default_value = "false")]
    pub table: bool,

    /// Output file (standard output if not given)
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Chrome trace file to record (needs the profiling feature)
    #[clap(long, value_name = "FILE")]
    pub trace_file: Option<PathBuf>,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        Settings::parse()
    }

    /// Spline configuration from the command line
    pub fn profile_config(&self) -> ProfileConfig {
        ProfileConfig {
            points_per_knot: self.points_per_knot,
            smoothing: self.smoothing,
            min_knots: self.min_knots,
        }
    }

    /// Elevation axis limit from the command line
    pub fn limit(&self) -> Limit {
        let mut limit = Limit::auto().with_system_range(self.sys_min, self.sys_max);
        limit.set_min(self.limit_min);
        limit.set_max(self.limit_max);
        limit.set_mode(self.limit_mode);
        limit
    }
}

fn parse_plot_mode(s: &str) -> Result<PlotMode, String> {
    s.parse().map_err(|e: ProfileError| e.to_string())
}

fn parse_units(s: &str) -> Result<UnitSystem, String> {
    s.parse().map_err(|e: ProfileError| e.to_string())
}

fn parse_limit_mode(s: &str) -> Result<LimitMode, String> {
    s.parse().map_err(|e: ProfileError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["track-profile", "-g", "a.gpx"]).unwrap();
        assert_eq!(settings.gpx_files, vec![PathBuf::from("a.gpx")]);
        assert_eq!(settings.mode, PlotMode::Normal);
        assert_eq!(settings.units, UnitSystem::Metric);
        assert_eq!(settings.format, OutputFormat::Json);
        assert_eq!(settings.profile_config(), ProfileConfig::default());
        assert_eq!(settings.limit(), Limit::auto());
        assert!(!settings.table);
    }

    #[test]
    fn test_gpx_files_required() {
        assert!(Settings::try_parse_from(["track-profile"]).is_err());
    }

    #[test]
    fn test_enumerated_options() {
        let settings = Settings::try_parse_from([
            "track-profile",
            "--gpx-files",
            "a.gpx",
            "b.gpx",
            "--mode",
            "icon",
            "--units",
            "Nautical",
            "--format",
            "csv",
        ])
        .unwrap();
        assert_eq!(settings.gpx_files.len(), 2);
        assert_eq!(settings.mode, PlotMode::Icon);
        assert_eq!(settings.units, UnitSystem::Nautical);
        assert_eq!(settings.format, OutputFormat::Csv);

        let invalid = ["track-profile", "-g", "a.gpx", "--units", "parsecs"];
        assert!(Settings::try_parse_from(invalid).is_err());
    }

    #[test]
    fn test_limit_from_arguments() {
        let settings = Settings::try_parse_from([
            "track-profile",
            "-g",
            "a.gpx",
            "--limit-mode",
            "user",
            "--limit-min",
            "-50",
            "--limit-max",
            "2000",
            "--sys-min",
            "0",
        ])
        .unwrap();
        let limit = settings.limit();
        assert_eq!(limit.mode(), LimitMode::User);
        assert_eq!(limit.apply(100.0, 500.0), (-50.0, 2000.0));

        let mut sys = limit;
        sys.set_mode(LimitMode::Sys);
        assert_eq!(sys.apply(100.0, 500.0), (0.0, 500.0));
    }

    #[test]
    fn test_profile_config_from_arguments() {
        let settings = Settings::try_parse_from([
            "track-profile",
            "-g",
            "a.gpx",
            "--points-per-knot",
            "8",
            "--smoothing",
            "0",
            "--min-knots",
            "4",
        ])
        .unwrap();
        let config = settings.profile_config();
        assert_eq!(config.points_per_knot, 8);
        assert_eq!(config.smoothing, 0.0);
        assert_eq!(config.min_knots, Some(4));
    }
}
