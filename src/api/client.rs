//! REST client for the remote store.
//!
//! ```text
//! GET    /<collection>?start=<ISO8601>   list (ranged collections only)
//! POST   /<collection>                   create, answers with the stored record
//! PUT    /<collection>/<id>              update
//! DELETE /<collection>/<id>              remove
//! GET    /blocks/next_before/<ISO8601>   next older block start
//! GET    /logout                         end the session
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{ApiError, NextBlockTimestamp, Resource};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// CRUD access to one collection.
#[async_trait]
pub trait Remote<T: Resource>: Send + Sync {
    /// Fetch the collection. `start` bounds ranged collections and is ignored otherwise.
    async fn list(&self, start: DateTime<Utc>) -> Result<Vec<T>, ApiError>;

    /// Persist a new item and return it with its server-assigned identity.
    async fn create(&self, item: &T) -> Result<T, ApiError>;

    async fn update(&self, item: &T) -> Result<(), ApiError>;

    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

/// Range and session endpoints that are not tied to a collection.
#[async_trait]
pub trait SessionRemote: Send + Sync {
    /// Start of the newest block that began strictly before `before`.
    async fn next_before(&self, before: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;
}

/// Timestamps travel as RFC 3339 in UTC with millisecond precision.
pub fn wire_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// reqwest-backed implementation of every remote seam.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base URL must start with http:// or https://, got {base_url:?}"
            )));
        }
        Ok(Self {
            base_url,
            auth_token,
            client: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        info!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!("Response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("API error: {} - {}", status, message);
            return Err(ApiError::Api { status, message });
        }
        Ok(response)
    }

    async fn send_json<R: DeserializeOwned>(builder: RequestBuilder) -> Result<R, ApiError> {
        let response = Self::send(builder).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            debug!("Unparseable body: {}", body);
            ApiError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl<T: Resource> Remote<T> for HttpBackend {
    async fn list(&self, start: DateTime<Utc>) -> Result<Vec<T>, ApiError> {
        let mut builder = self.request(Method::GET, T::PATH);
        if T::RANGED {
            builder = builder.query(&[("start", wire_timestamp(start))]);
        }
        let items: Vec<T> = Self::send_json(builder).await?;
        debug!("Fetched {} {}", items.len(), T::PATH);
        Ok(items)
    }

    async fn create(&self, item: &T) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, T::PATH).json(item);
        Self::send_json(builder).await
    }

    async fn update(&self, item: &T) -> Result<(), ApiError> {
        let path = format!("{}/{}", T::PATH, item.id());
        let builder = self.request(Method::PUT, &path).json(item);
        Self::send(builder).await.map(|_| ())
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", T::PATH, id);
        Self::send(self.request(Method::DELETE, &path)).await.map(|_| ())
    }
}

#[async_trait]
impl SessionRemote for HttpBackend {
    async fn next_before(&self, before: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
        let path = format!("blocks/next_before/{}", wire_timestamp(before));
        let next: NextBlockTimestamp = Self::send_json(self.request(Method::GET, &path)).await?;
        Ok(next.block_timestamp)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        Self::send(self.request(Method::GET, "logout")).await.map(|_| ())
    }
}
