//! Idempotent resource creation.

use std::future::Future;

use tracing::{info, warn};

use crate::cloud::ApiError;
use crate::resources::ResourceKind;

/// Result of a create call that tolerates pre-existing resources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Creation<T> {
    /// The resource was created; carries the call's response.
    Created(T),
    /// The service reported that the resource already exists.
    AlreadyExists,
}

impl<T> Creation<T> {
    /// Returns the response of a fresh creation, if any.
    #[must_use]
    pub fn created(self) -> Option<T> {
        match self {
            Self::Created(value) => Some(value),
            Self::AlreadyExists => None,
        }
    }
}

/// Awaits `request`, treating a conflict status as success so the calling
/// step can be re-run after a partial failure.
///
/// # Errors
///
/// Returns any non-conflict [`ApiError`] from `request` unchanged.
pub async fn create_if_absent<T, Fut>(
    kind: ResourceKind,
    name: &str,
    request: Fut,
) -> Result<Creation<T>, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    match request.await {
        Ok(response) => {
            info!(%kind, name, "created");
            Ok(Creation::Created(response))
        }
        Err(err) if err.is_conflict() => {
            warn!(%kind, name, "already exists; reusing it");
            Ok(Creation::AlreadyExists)
        }
        Err(err) => Err(err),
    }
}
