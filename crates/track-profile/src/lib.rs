//! Track Profile - command line front end of `track-profile-lib`
//!
//! Loads GPX files, builds the elevation profile of every track in parallel and writes the
//! datasets as JSON or CSV.

mod logging;
mod metadata;
mod output;
mod settings;

pub use logging::{LoggingGuard, default_directives, setup_logging_and_profiling};
pub use metadata::{log_version_info, short_version_info};
pub use settings::{OutputFormat, Settings};

use output::TrackTable;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use track_profile_lib::{
    AsciiGrid, Collaborators, ElevationLookup, NoTerrain, ProfileDataset, ProfileError, Project,
    Track, build_profile, point_table,
};

/// Errors of the command line front end
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No tracks found in the given files")]
    NoTracks,

    #[error("Track {index} does not exist, {available} tracks loaded")]
    TrackIndex { index: usize, available: usize },
}

/// Load the files, build the requested output and write it
pub fn run(settings: &Settings) -> Result<(), CliError> {
    match &settings.output {
        Some(path) => {
            let file = File::create(path)?;
            run_with_writer(settings, BufWriter::new(file))?;
            tracing::info!("Wrote {}", path.display());
            Ok(())
        }
        None => run_with_writer(settings, std::io::stdout().lock()),
    }
}

/// Same as [`run`] with an explicit output
pub fn run_with_writer<W: Write>(settings: &Settings, writer: W) -> Result<(), CliError> {
    let config = settings.profile_config();
    config.validate()?;

    let projects = load_projects(settings)?;
    let selected = select_tracks(&projects, settings.track)?;

    if settings.table {
        let rows: Vec<_> = selected
            .par_iter()
            .map(|(_, track)| point_table(track, &settings.units))
            .collect();
        let tables: Vec<TrackTable<'_>> = selected
            .iter()
            .zip(&rows)
            .map(|((_, track), points)| TrackTable {
                track: track.name(),
                points,
            })
            .collect();
        return match settings.format {
            OutputFormat::Json => output::write_tables_json(&tables, writer),
            OutputFormat::Csv => output::write_tables_csv(&tables, writer),
        };
    }

    let terrain: Box<dyn ElevationLookup> = match &settings.dem {
        Some(path) => {
            tracing::info!("Loading terrain grid {}", path.display());
            Box::new(AsciiGrid::open(path)?)
        }
        None => Box::new(NoTerrain),
    };
    let limit = settings.limit();

    let datasets = selected
        .par_iter()
        .map(|(project, track)| {
            let collaborators =
                Collaborators::new(&settings.units, terrain.as_ref()).with_waypoints(*project);
            build_profile(track, &limit, settings.mode, &collaborators, &config)
        })
        .collect::<Result<Vec<ProfileDataset>, ProfileError>>()?;
    tracing::info!("Built {} profiles", datasets.len());

    match settings.format {
        OutputFormat::Json => output::write_json(&datasets, writer),
        OutputFormat::Csv => output::write_csv(&datasets, writer),
    }
}

/// Open every GPX file in parallel and attach nearby waypoints
fn load_projects(settings: &Settings) -> Result<Vec<Project>, CliError> {
    profiling::scope!("load_projects");

    let mut projects = settings
        .gpx_files
        .par_iter()
        .map(|path| {
            let project = Project::open(path)?;
            tracing::info!(
                "Loaded {}: {} tracks, {} waypoints",
                path.display(),
                project.tracks.len(),
                project.waypoints().len()
            );
            Ok(project)
        })
        .collect::<Result<Vec<Project>, ProfileError>>()?;

    if let Some(radius) = settings.waypoint_radius {
        for project in &mut projects {
            let mut tracks = std::mem::take(&mut project.tracks);
            let linked: usize = tracks
                .iter_mut()
                .map(|track| track.link_waypoints(project, radius))
                .sum();
            project.tracks = tracks;
            tracing::debug!("Linked {linked} waypoints in {:?}", project.name);
        }
    }
    Ok(projects)
}

/// Tracks to profile with their owning project
fn select_tracks(
    projects: &[Project],
    index: Option<usize>,
) -> Result<Vec<(&Project, &Track)>, CliError> {
    let all: Vec<(&Project, &Track)> = projects
        .iter()
        .flat_map(|project| project.tracks.iter().map(move |track| (project, track)))
        .collect();
    if all.is_empty() {
        return Err(CliError::NoTracks);
    }
    match index {
        None => Ok(all),
        Some(index) => match all.get(index) {
            Some(&selected) => Ok(vec![selected]),
            None => Err(CliError::TrackIndex {
                index,
                available: all.len(),
            }),
        },
    }
}
