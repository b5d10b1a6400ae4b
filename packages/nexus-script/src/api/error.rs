use bon::Builder;
use http::StatusCode;
use thiserror::Error;

/// A non-success response from Nexus.
///
/// The whole response body is kept: Nexus reports script compilation and
/// runtime failures in it, and it is the only useful diagnostic.
#[derive(Builder, Debug, Error)]
#[error("HTTP ERROR {}: {reason}\n{url}\n{body}", .status.as_u16())]
pub struct NexusError {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The reason phrase for the status code.
    #[builder(into)]
    pub reason: String,
    /// The URL that was requested.
    #[builder(into)]
    pub url: String,
    /// The raw response body.
    #[builder(into, default)]
    pub body: String,
}

impl NexusError {
    pub fn new<U, B>(status: StatusCode, url: U, body: B) -> Self
    where
        U: Into<String>,
        B: Into<String>,
    {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            url: url.into(),
            body: body.into(),
        }
    }
}
