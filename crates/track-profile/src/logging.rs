/*!
Logging and profiling setup.

Log lines go to standard error so they never mix with the profile output. The filter
comes from `RUST_LOG` and falls back to a build dependent default. When compiled with
the `profiling` feature a chrome trace can be recorded alongside.
*/

use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Keeps the trace file open; flushes it when dropped
#[must_use = "dropping the guard stops trace recording"]
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Log filter used when `RUST_LOG` is not set
pub fn default_directives() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives()))
}

/// Install the global subscriber
///
/// Does nothing if a subscriber is already installed.
pub fn setup_logging_and_profiling(trace_file: Option<&Path>) -> LoggingGuard {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    #[cfg(feature = "profiling")]
    {
        let (chrome_layer, guard) = match trace_file {
            Some(path) => {
                let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                    .file(path)
                    .include_args(true)
                    .build();
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };
        let installed = tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .try_init()
            .is_ok();
        if installed && let Some(path) = trace_file {
            tracing::info!("Recording chrome trace to {}", path.display());
        }
        LoggingGuard { _chrome: guard }
    }

    #[cfg(not(feature = "profiling"))]
    {
        let installed = tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .is_ok();
        if installed && let Some(path) = trace_file {
            tracing::warn!(
                "Ignoring trace file {}: built without the profiling feature",
                path.display()
            );
        }
        LoggingGuard {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(default_directives()).is_ok());
    }

    #[test]
    fn test_setup_twice() {
        let _first = setup_logging_and_profiling(None);
        let _second = setup_logging_and_profiling(None);
        tracing::info!("still logging");
    }
}
