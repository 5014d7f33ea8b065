//! Error types for runtime acquisition, file parsing, and playback.

use serde::{Deserialize, Serialize};

/// Diagnostic emitted (once as a warning, once as an error) when a file fails to parse.
pub const CORRUPT_FILE_MESSAGE: &str = "Problem loading file; may be corrupt!";

/// Error type shared by the loader, the contents model, and the player.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RiveError {
    /// Neither a URL nor a buffer was supplied at construction
    #[error("Rive source file or data buffer required")]
    MissingSource,

    /// Both a URL and a buffer were supplied at construction
    #[error("Only one of src or buffer may be supplied")]
    AmbiguousSource,

    /// A player was constructed outside of an async runtime
    #[error("Player construction requires a running tokio runtime")]
    NoAsyncRuntime,

    /// The runtime module failed to initialize
    #[error("Runtime initialization failed: {reason}")]
    RuntimeInit { reason: String },

    /// The runtime loader went away before answering
    #[error("Runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },

    /// Fetching a file from a URL failed
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The runtime could not parse the supplied bytes
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// A state machine input carried a type tag outside Number/Boolean/Trigger
    #[error("Unknown input type {tag} for input '{input}' in state machine '{state_machine}'")]
    UnknownInputType {
        state_machine: String,
        input: String,
        tag: u16,
    },

    /// The requested artboard does not exist in the file
    #[error("Artboard not found: {name}")]
    ArtboardNotFound { name: String },

    /// No artboard was requested and the file has none to default to
    #[error("File contains no default artboard")]
    NoDefaultArtboard,

    /// The requested animation does not exist on the artboard
    #[error("Animation not found: {name} in artboard {artboard}")]
    AnimationNotFound { artboard: String, name: String },
}

impl RiveError {
    /// Parse failures are the only errors surfaced with the corrupt-file diagnostic.
    #[inline]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::UnknownInputType { .. })
    }

    /// Configuration errors abort construction; everything else is reported through
    /// `LoadError` and leaves the player usable.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::MissingSource | Self::AmbiguousSource | Self::NoAsyncRuntime
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingSource | Self::AmbiguousSource | Self::NoAsyncRuntime => "configuration",
            Self::Parse { .. } | Self::UnknownInputType { .. } => "parse",
            Self::RuntimeInit { .. }
            | Self::RuntimeUnavailable { .. }
            | Self::Fetch { .. }
            | Self::ArtboardNotFound { .. }
            | Self::NoDefaultArtboard
            | Self::AnimationNotFound { .. } => "runtime",
        }
    }
}

impl From<serde_json::Error> for RiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}
