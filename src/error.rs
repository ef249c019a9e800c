use std::io;
use thiserror::Error;

/// Failures a command reports back to the loop.
///
/// None of these stop the shell: the builtin adapter prints the message and the
/// next prompt follows.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Required arguments are missing.
    #[error("Error: '{command}' command requires {what}.")]
    Usage {
        command: &'static str,
        what: &'static str,
    },

    /// Target path is absent.
    #[error("Error: {what} does not exist: {name}")]
    NotFound { what: &'static str, name: String },

    /// An underlying filesystem or process call failed.
    #[error("{context}: {source}")]
    Operation {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Malformed permission string given to chmod.
    #[error("Error: Invalid permission format.")]
    Parse(String),
}

impl ShellError {
    pub fn operation(context: impl Into<String>, source: io::Error) -> Self {
        Self::Operation {
            context: context.into(),
            source,
        }
    }
}

/// Shorthand for attaching a `ShellError::Operation` context to io results.
pub(crate) trait OperationContext<T> {
    fn operation(self, context: &str) -> Result<T, ShellError>;
}

impl<T> OperationContext<T> for io::Result<T> {
    fn operation(self, context: &str) -> Result<T, ShellError> {
        self.map_err(|e| ShellError::operation(context, e))
    }
}
