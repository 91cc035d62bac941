use std::time::Duration;

use futures::StreamExt;
use reqwest::ClientBuilder;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use quiver_security::{validate_url, UrlPolicy};

use crate::{Error, NetworkErrorKind};

/// A builder for a [`DownloadClient`].
#[derive(Debug, Clone)]
pub struct DownloadClientBuilder {
    retries: u32,
    connect_timeout: Duration,
    total_timeout: Duration,
}

impl Default for DownloadClientBuilder {
    fn default() -> Self {
        Self {
            retries: 3,
            connect_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(60),
        }
    }
}

impl DownloadClientBuilder {
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn total_timeout(mut self, total_timeout: Duration) -> Self {
        self.total_timeout = total_timeout;
        self
    }

    pub fn build(self) -> DownloadClient {
        let client = ClientBuilder::new()
            .user_agent("quiver")
            .connect_timeout(self.connect_timeout)
            .timeout(self.total_timeout)
            .build()
            .expect("failed to build the HTTP client");

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(self.retries);
        let retry_strategy = RetryTransientMiddleware::new_with_policy(retry_policy);
        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(retry_strategy)
            .build();

        DownloadClient { client }
    }
}

/// Fetches resource content over HTTPS from allowlisted hosts.
#[derive(Debug, Clone)]
pub struct DownloadClient {
    client: ClientWithMiddleware,
}

impl DownloadClient {
    /// Download `url` into memory, enforcing `policy` before connecting and
    /// `max_bytes` while streaming the body.
    ///
    /// The size cap is checked against the declared `Content-Length` up
    /// front and re-checked as bytes arrive, so a lying server cannot
    /// overshoot it. Cancellation aborts the in-flight transfer.
    pub async fn fetch(
        &self,
        url: &Url,
        policy: &UrlPolicy,
        max_bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, Error> {
        validate_url(url, policy)?;

        tokio::select! {
            () = cancel.cancelled() => Err(Error::Canceled),
            bytes = self.fetch_inner(url, max_bytes) => bytes,
        }
    }

    async fn fetch_inner(&self, url: &Url, max_bytes: u64) -> Result<Vec<u8>, Error> {
        trace!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| network_error(url, err))?;

        if let Err(err) = response.error_for_status_ref() {
            return Err(Error::Network {
                url: url.to_string(),
                kind: classify_reqwest(&err),
                source: Box::new(err),
            });
        }

        if response.content_length().is_some_and(|length| length > max_bytes) {
            return Err(Error::TooLarge {
                url: url.to_string(),
                limit: max_bytes,
            });
        }

        let mut buffer = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| Error::Network {
                url: url.to_string(),
                kind: NetworkErrorKind::Read,
                source: Box::new(err),
            })?;
            if buffer.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(Error::TooLarge {
                    url: url.to_string(),
                    limit: max_bytes,
                });
            }
            buffer.extend_from_slice(&chunk);
        }

        debug!("Fetched {} byte(s) from {url}", buffer.len());
        Ok(buffer)
    }
}

fn network_error(url: &Url, err: reqwest_middleware::Error) -> Error {
    let kind = match &err {
        reqwest_middleware::Error::Reqwest(err) => classify_reqwest(err),
        reqwest_middleware::Error::Middleware(_) => NetworkErrorKind::Connect,
    };
    Error::Network {
        url: url.to_string(),
        kind,
        source: Box::new(err),
    }
}

fn classify_reqwest(err: &reqwest::Error) -> NetworkErrorKind {
    if let Some(status) = err.status() {
        NetworkErrorKind::Status(status.as_u16())
    } else if err.is_timeout() {
        NetworkErrorKind::Timeout
    } else if err.is_connect() {
        NetworkErrorKind::Connect
    } else {
        NetworkErrorKind::Read
    }
}
