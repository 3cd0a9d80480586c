use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::model::{Block, Entry, Project};

/// Errors that can occur while talking to the remote store.
/// Variants carry enough info to decide what the user is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Backend misconfigured (bad base URL, unusable token).
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// The server answered with a non-success status.
    Api { status: u16, message: String },
    /// The response body did not have the expected shape.
    Parse(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Api { status: 404, .. })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(msg) => write!(f, "config error: {msg}"),
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ApiError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// An entity type the REST API exposes as a collection.
pub trait Resource: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection path below the base URL, e.g. `"blocks"`.
    const PATH: &'static str;
    /// Whether listing takes the visible range's `start` parameter.
    const RANGED: bool;

    fn id(&self) -> i64;
}

impl Resource for Block {
    const PATH: &'static str = "blocks";
    const RANGED: bool = true;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Resource for Entry {
    const PATH: &'static str = "entries";
    const RANGED: bool = true;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Resource for Project {
    const PATH: &'static str = "projects";
    const RANGED: bool = false;

    fn id(&self) -> i64 {
        self.id
    }
}

/// Body of `GET /blocks/next_before/<timestamp>`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NextBlockTimestamp {
    pub block_timestamp: DateTime<Utc>,
}
