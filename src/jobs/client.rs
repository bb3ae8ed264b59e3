//! Backend job API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::cookies::{cookie_header, RequestCookie};
use crate::jobs::types::{JobError, JobStatus, JobSubmission};

/// Operations the poller needs from the backend.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// `POST /api/organizations/{id}/sync`.
    async fn submit_sync(&self, organization_id: u64) -> Result<JobSubmission, JobError>;

    /// `GET /api/jobs/{jobId}`; `Ok(None)` when the backend answers 404.
    async fn fetch_status(&self, job_id: &str) -> Result<Option<JobStatus>, JobError>;
}

#[async_trait]
impl<T: JobApi + ?Sized> JobApi for Arc<T> {
    async fn submit_sync(&self, organization_id: u64) -> Result<JobSubmission, JobError> {
        (**self).submit_sync(organization_id).await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<Option<JobStatus>, JobError> {
        (**self).fetch_status(job_id).await
    }
}

/// Per-request bound applied unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `JobApi` over HTTP, authenticated by the caller's cookies.
///
/// `base_url` may point at the backend itself or at the proxy prefix.
#[derive(Clone)]
pub struct HttpJobApi {
    client: Client,
    base_url: Url,
    cookies: Vec<RequestCookie>,
}

impl HttpJobApi {
    pub fn new(base_url: &str) -> Result<Self, JobError> {
        let base_url =
            Url::parse(base_url).map_err(|_| JobError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(JobError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client: build_client(DEFAULT_REQUEST_TIMEOUT)?,
            base_url,
            cookies: Vec::new(),
        })
    }

    /// Bound every request, response body included, by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, JobError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Send these cookies with every request.
    pub fn with_cookies(mut self, cookies: Vec<RequestCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(cookie) = cookie_header(&self.cookies) {
            builder = builder.header(COOKIE, cookie);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, JobError> {
        builder
            .send()
            .await
            .map_err(|e| JobError::Transport(e.to_string()))
    }
}

fn build_client(timeout: Duration) -> Result<Client, JobError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| JobError::Transport(e.to_string()))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, JobError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| JobError::Transport(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| JobError::Decode(e.to_string()))
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn submit_sync(&self, organization_id: u64) -> Result<JobSubmission, JobError> {
        let id = organization_id.to_string();
        let url = self.endpoint(&["api", "organizations", &id, "sync"]);
        let response = self.send(self.request(Method::POST, url)).await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(organization_id, status = %status, "Sync submission rejected");
            return Err(JobError::UnexpectedStatus(status.as_u16()));
        }
        decode(response).await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<Option<JobStatus>, JobError> {
        let url = self.endpoint(&["api", "jobs", job_id]);
        let response = self.send(self.request(Method::GET, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => decode(response).await.map(Some),
            status => Err(JobError::UnexpectedStatus(status.as_u16())),
        }
    }
}
