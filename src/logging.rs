//! Logger setup and scoped verbosity control.

use env_logger::Env;
use log::LevelFilter;

/// Default `RUST_LOG` filter for the given CLI verbosity flags.
pub fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialise `env_logger`, honouring `RUST_LOG` when set.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(default_filter: &str) {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .try_init();
}

/// Lowers the process-wide maximum log level until dropped.
///
/// The override never raises verbosity: if the current level is already
/// quieter than the requested one, it is kept.
/// The previous level is restored in `Drop`, so early returns, `?`
/// propagation and unwinding all put it back.
#[must_use = "the override is undone as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LogLevelOverride {
    previous: LevelFilter,
}

impl LogLevelOverride {
    pub fn new(level: LevelFilter) -> Self {
        let previous = log::max_level();
        log::set_max_level(level.min(previous));
        Self { previous }
    }

    /// Level that will be restored on drop.
    pub fn previous(&self) -> LevelFilter {
        self.previous
    }
}

impl Drop for LogLevelOverride {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}
