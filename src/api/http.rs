//! HTTP client for the dispatch REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::ClientConfig,
    ride::{Ride, RidePatch},
    rider::{Rider, RiderDraft, RiderPatch},
};

use super::{ApiError, ApiResult, Envelope, RideApi, RiderApi};

/// [`RiderApi`] and [`RideApi`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let env: Envelope<T> = serde_json::from_str(&body)?;
            Ok(env.into_inner())
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_empty(&self, req: RequestBuilder) -> ApiResult<()> {
        let response = req.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl RiderApi for HttpApi {
    async fn list_riders(&self) -> ApiResult<Vec<Rider>> {
        let url = self.url("/api/riders");
        debug!(%url, "GET riders");
        self.send_json(self.client.get(&url)).await
    }

    async fn update_rider(&self, id: &str, patch: &RiderPatch) -> ApiResult<Rider> {
        let url = self.url(&format!("/api/riders/{id}"));
        debug!(%url, "PUT rider");
        self.send_json(self.client.put(&url).json(patch)).await
    }

    async fn create_rider(&self, draft: &RiderDraft) -> ApiResult<Rider> {
        let url = self.url("/api/riders");
        debug!(%url, "POST rider");
        self.send_json(self.client.post(&url).json(draft)).await
    }

    async fn delete_rider(&self, id: &str) -> ApiResult<()> {
        let url = self.url(&format!("/api/riders/{id}"));
        debug!(%url, "DELETE rider");
        self.send_empty(self.client.delete(&url)).await
    }
}

#[async_trait]
impl RideApi for HttpApi {
    async fn list_rides(&self) -> ApiResult<Vec<Ride>> {
        let url = self.url("/api/rides");
        debug!(%url, "GET rides");
        self.send_json(self.client.get(&url)).await
    }

    async fn update_ride(&self, id: &str, patch: &RidePatch) -> ApiResult<Ride> {
        let url = self.url(&format!("/api/rides/{id}"));
        debug!(%url, "PUT ride");
        self.send_json(self.client.put(&url).json(patch)).await
    }

    async fn delete_ride(&self, id: &str) -> ApiResult<()> {
        let url = self.url(&format!("/api/rides/{id}"));
        debug!(%url, "DELETE ride");
        self.send_empty(self.client.delete(&url)).await
    }
}
