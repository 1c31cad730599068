//! Airflow REST API client.

mod airflow;

pub use airflow::*;

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall per-request timeout. Distinct from the polling loop, which has
/// no deadline of its own.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with proper timeout configuration.
pub(crate) fn build_http_client(accept_invalid_certs: bool) -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .expect("Failed to build HTTP client")
}

/// Errors from Airflow API operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure before a response arrived.
    #[error("Request failed: {0}")]
    Request(String),
    /// The orchestrator rejected the start request. Fatal; never retried.
    #[error("Failed to trigger DAG run: HTTP {status}: {body}")]
    Trigger { status: u16, body: String },
    /// A status fetch came back non-200. The monitor loop recovers from
    /// this by retrying on the next interval.
    #[error("Error fetching DAG run status: HTTP {status}: {body}")]
    Fetch { status: u16, body: String },
    #[error("Malformed response body: {0}")]
    Parse(String),
    #[error("DAG {0} has no runs")]
    NoRuns(String),
    #[error("Invalid URL: {0}")]
    BadUrl(String),
}
