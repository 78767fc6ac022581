//! # Structured Logging
//!
//! All logs go to stderr so that stdout stays reserved for command output.

use tracing::Subscriber;
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for one secret operation.
///
/// Every span gets a fresh `operation_id` so the sub-requests of an operation can be
/// grouped in the logs.
///
/// ```rust,ignore
/// let span = vault_span!("create", path);
/// let span = vault_span!("create", path, part = "private");
/// ```
#[macro_export]
macro_rules! vault_span {
    ($operation:expr, $path:expr) => {
        tracing::debug_span!(
            "vault_operation",
            operation = %$operation,
            path = %$path,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $path:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "vault_operation",
            operation = %$operation,
            path = %$path,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Logging options, usually taken from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Debug level by default instead of info
    pub verbose: bool,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl LoggingConfig {
    /// `RUST_LOG` wins over the verbosity flag.
    pub fn env_filter(&self) -> EnvFilter {
        let default_level = if self.verbose { "debug" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }
}

/// Build the stderr subscriber for `config` without installing it.
pub fn build_subscriber(config: &LoggingConfig) -> Box<dyn Subscriber + Send + Sync> {
    let builder = fmt().with_env_filter(config.env_filter()).with_writer(std::io::stderr);

    if config.json {
        Box::new(builder.json().with_current_span(true).finish())
    } else {
        Box::new(builder.with_target(false).finish())
    }
}

/// Install the global subscriber. Does nothing if one is already installed.
pub fn init_logging(config: &LoggingConfig) {
    if tracing::subscriber::set_global_default(build_subscriber(config)).is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
}
