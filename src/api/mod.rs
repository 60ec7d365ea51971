//! Remote REST surface consumed by the domain wrappers.

pub mod http;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    ride::{Ride, RidePatch},
    rider::{Rider, RiderDraft, RiderPatch},
};

/// Failure of a remote call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response.
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// Response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Any other failure, mostly from test doubles.
    #[error("{0}")]
    Message(String),
}

/// Result alias for remote calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Response body that is either `{ "data": T }` or a bare `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(v) => v,
        }
    }
}

/// Rider endpoints under `/api/riders`.
#[async_trait]
pub trait RiderApi: Send + Sync {
    /// `GET /api/riders`.
    async fn list_riders(&self) -> ApiResult<Vec<Rider>>;
    /// `PUT /api/riders/{id}` with a partial body.
    async fn update_rider(&self, id: &str, patch: &RiderPatch) -> ApiResult<Rider>;
    /// `POST /api/riders`.
    async fn create_rider(&self, draft: &RiderDraft) -> ApiResult<Rider>;
    /// `DELETE /api/riders/{id}`.
    async fn delete_rider(&self, id: &str) -> ApiResult<()>;
}

/// Ride endpoints under `/api/rides`.
#[async_trait]
pub trait RideApi: Send + Sync {
    /// `GET /api/rides`.
    async fn list_rides(&self) -> ApiResult<Vec<Ride>>;
    /// `PUT /api/rides/{id}` with only the changed fields.
    async fn update_ride(&self, id: &str, patch: &RidePatch) -> ApiResult<Ride>;
    /// `DELETE /api/rides/{id}`.
    async fn delete_ride(&self, id: &str) -> ApiResult<()>;
}
