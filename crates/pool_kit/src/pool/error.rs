//! Pool error types

use thiserror::Error;

use crate::host::InstanceId;

/// Pool and registry lookup errors
///
/// The plain registry operations log these and carry on; the `try_*`
/// variants hand them back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No pool is registered under the key
    #[error("Pool not found for key: {0}")]
    PoolNotFound(String),

    /// The instance is not a live instance of any registered pool
    #[error("Instance {0:?} is not managed by the registry")]
    NotTracked(InstanceId),

    /// A new pool needs a template but none was configured
    #[error("No template configured for pool: {0}")]
    MissingTemplate(String),
}
