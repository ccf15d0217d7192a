use std::process::ExitCode;
use track_profile::{Settings, log_version_info, run, setup_logging_and_profiling};

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    let _guard = setup_logging_and_profiling(settings.trace_file.as_deref());
    log_version_info();

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
