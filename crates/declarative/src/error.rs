//! Error types for the apply engine.
//!
//! Errors come in two tiers. Attribute-level errors are recoverable: the
//! failing attribute is reported and its siblings are still evaluated.
//! Interruptions are fatal: they are recorded for bookkeeping and then end
//! the evaluation of the whole resource.

use thiserror::Error;

/// Errors raised by an attribute while testing or applying its state.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The change could not be made; other attributes are unaffected
    #[error("{0}")]
    Failed(String),

    /// Any other recoverable error from the underlying mechanism
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// The process must stop (e.g. a signal arrived mid-change)
    #[error("interrupted: {0}")]
    Interrupted(String),
}

impl AttributeError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted(message.into())
    }

    /// Whether this error must unwind out of the resource evaluation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

/// Errors that fail the evaluation of a whole resource.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The current state could not be read
    #[error("could not retrieve current state: {0:#}")]
    Retrieve(#[source] anyhow::Error),

    /// An attribute change was interrupted by a fatal error
    #[error("change to '{attribute}' was interrupted: {source}")]
    Interrupted {
        attribute: String,
        #[source]
        source: AttributeError,
    },

    /// The post-apply hook failed
    #[error("post-apply flush failed: {0:#}")]
    Flush(#[source] anyhow::Error),
}

impl HarnessError {
    /// Whether the caller must stop processing further resources.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Errors from resolving or validating schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("could not find schedule '{name}' for {resource}")]
    NotFound { resource: String, name: String },

    #[error("invalid schedule: {0}")]
    Invalid(String),
}
