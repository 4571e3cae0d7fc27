use std::time::Duration;
use thiserror::Error;

pub mod client;
pub mod config;
pub mod crawler;
pub mod search;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use client::PlaceClient;
pub use self::config::{CrawlerConfig, DelayRange};
pub use types::{PlaceResponse, Record, SearchQuery};

/// The `CrawlerError` enum represents the errors that can occur while crawling the place API.
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Represents a transport-level failure of an HTTP request.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with something other than `200 OK`.
    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    /// Every attempt of a request failed.
    #[error("Request failed after {attempts} attempts: {url}")]
    RetriesExhausted { url: String, attempts: u32 },
    /// The configured endpoint could not be turned into a request URL.
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// The response body was not the expected JSON shape.
    #[error("Response parsing failed: {0}")]
    Parse(#[from] serde_json::Error),
    /// Represents an error while loading or validating the configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    /// Represents a filesystem failure while writing the output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Represents a failure while serializing the CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A type alias for `Result` with the `CrawlerError` error type.
pub type Result<T> = std::result::Result<T, CrawlerError>;

// Constants

/// The place search endpoint of the Baidu map API.
pub const DEFAULT_ENDPOINT: &str = "http://api.map.baidu.com/place/v2/search";
/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// The default number of attempts for a single request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Number of records the API returns per page.
pub const PAGE_SIZE: u32 = 20;
/// The API never serves more than this many pages for one query.
pub const MAX_PAGES: u32 = 20;
