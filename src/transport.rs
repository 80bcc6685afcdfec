//! The network seam between [`Client`](crate::check::Client) and the index.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_REPOSITORY"),
    ")"
);

/// Issues a single `GET` and reports the response status.
///
/// Only the status is read; response bodies are never parsed. Implementations
/// must not retry, and dropping the returned future must abandon the request.
pub trait Transport: Send + Sync + 'static {
    /// Request `url` and resolve to the HTTP status code of the response.
    fn get(&self, url: &str) -> impl Future<Output = Result<u16, TransportError>> + Send;
}

/// A request that produced no HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// Connection, TLS, timeout or protocol failure.
    #[error("request failed: {0}")]
    Http(#[source] Box<dyn Error + Send + Sync>),
}

/// [`Transport`] backed by an async `reqwest` client.
///
/// Dropping a pending [`get`](Transport::get) closes its connection, so a
/// cancelled lookup does not hold a socket open against the index.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<u16, TransportError>> + Send {
        let request = self.http.get(url).send();
        async move {
            let response = request
                .await
                .map_err(|e| TransportError::Http(Box::new(e)))?;
            Ok(response.status().as_u16())
        }
    }
}
