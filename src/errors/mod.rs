//! # Error Handling
//!
//! Crate-level error type for vaultprov. Failures raised while talking to Vault are
//! defined in [`crate::vault::VaultError`] and wrapped here. Operations that leave the
//! store in a partially written state report a [`Warning`] next to the primary error.

use std::fmt;

use crate::vault::VaultError;

/// Custom result type for vaultprov operations
pub type Result<T> = std::result::Result<T, Error>;

/// Operator-facing warning attached to a partially failed operation.
///
/// A warning means something was left behind in Vault and needs manual cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub summary: String,
    pub detail: String,
}

impl Warning {
    pub fn new<S: Into<String>, D: Into<String>>(summary: S, detail: D) -> Self {
        Self { summary: summary.into(), detail: detail.into() }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// Main error type for vaultprov
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be loaded or deserialized
    #[error("Configuration loading failed: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Invalid input, including attempts to change immutable attributes
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication against Vault failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Secret material could not be generated
    #[error("Secret generation failed: {0}")]
    Generation(String),

    /// Vault path resolution or secret lifecycle errors
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation failed after some side effects were already committed
    #[error("{source} (warning: {warning})")]
    PartialFailure {
        #[source]
        source: Box<Error>,
        warning: Warning,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    /// Create a new generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation(message.into())
    }

    /// Attach a warning to a primary error
    pub fn partial_failure(primary: Error, warning: Warning) -> Self {
        Self::PartialFailure { source: Box::new(primary), warning }
    }

    /// The warning carried by a partial failure, if any
    pub fn warning(&self) -> Option<&Warning> {
        match self {
            Self::PartialFailure { warning, .. } => Some(warning),
            _ => None,
        }
    }

    /// The primary error, looking through any partial failure wrapper
    pub fn primary(&self) -> &Error {
        match self {
            Self::PartialFailure { source, .. } => source.primary(),
            other => other,
        }
    }

    /// The underlying Vault error, if the primary error came from Vault
    pub fn vault_error(&self) -> Option<&VaultError> {
        match self.primary() {
            Self::Vault(err) => Some(err),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages("", &errors, &mut messages);
        messages.sort();

        Self::validation(format!("Validation failed: {}", messages.join("; ")))
    }
}

/// Flatten nested validation errors into `field.path: message` entries.
fn collect_validation_messages(
    prefix: &str,
    errors: &validator::ValidationErrors,
    messages: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let name =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                messages.push(format!("{}: {}", name, error_messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_messages(&name, nested, messages);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(&format!("{}[{}]", name, index), nested, messages);
                }
            }
        }
    }
}
