pub mod client;
pub mod types;

pub use client::{DEFAULT_BASE_URL, HttpBackend, Remote, SessionRemote, wire_timestamp};
pub use types::{ApiError, NextBlockTimestamp, Resource};
