//! Builder error types

use thiserror::Error;

use crate::pool::PoolError;

/// Misuse of a builder handle
///
/// These are programming mistakes and are always returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuilderError {
    /// The builder was already disposed and its slot returned to the pool
    #[error("Builder has already been disposed")]
    Disposed,
}

/// Failure inside a build step or a build hook
///
/// Builds never hand these back; they are logged and the build yields the
/// best product available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildFailure {
    /// The context has neither a template nor a loader producing one
    #[error("No template configured")]
    MissingTemplate,

    /// The pool layer rejected the request
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// A pre- or post-build hook failed
    #[error("Build hook failed: {0}")]
    Hook(String),
}

impl BuildFailure {
    /// Hook failure with a message
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }
}
