//! Network capability
//!
//! The controller never talks to sockets directly; it asks a [`Network`]
//! for a response. A non-2xx status is still a response. Only transport
//! failures (DNS, refused connection, timeout) are errors, and those are
//! what trigger the cache fallback.

use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Method, Request, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Abstract network interface
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request and return whatever the origin answered
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response>;
}

/// HTTP network backed by `ureq`, resolving root-relative URLs against an origin
#[derive(Clone)]
pub struct HttpNetwork {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpNetwork {
    /// Create a network for the given origin.
    ///
    /// With no timeout, the transport's own connection timeout decides when
    /// a request counts as failed.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        Self {
            base_url: base_url.into(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Origin base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a request URL to an absolute URL
    pub fn resolve(&self, url: &str) -> PrecacheResult<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        if !url.starts_with('/') {
            return Err(PrecacheError::InvalidUrl(url.to_string()));
        }
        Ok(format!("{}{}", self.base_url.trim_end_matches('/'), url))
    }

    fn fetch_blocking(agent: &ureq::Agent, url: &str, request: &Request) -> PrecacheResult<Response> {
        let result = match request.method {
            Method::Get => with_headers(agent.get(url), &request.headers).call(),
            Method::Head => with_headers(agent.head(url), &request.headers).call(),
            Method::Delete => with_headers(agent.delete(url), &request.headers).call(),
            Method::Options => with_headers(agent.options(url), &request.headers).call(),
            Method::Post => with_headers(agent.post(url), &request.headers).send(&request.body[..]),
            Method::Put => with_headers(agent.put(url), &request.headers).send(&request.body[..]),
            Method::Patch => with_headers(agent.patch(url), &request.headers).send(&request.body[..]),
        };

        let mut response = result.map_err(|e| PrecacheError::network(url, e))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        if request.method != Method::Head {
            response
                .body_mut()
                .as_reader()
                .read_to_end(&mut body)
                .map_err(|e| PrecacheError::network(url, e))?;
        }

        let mut snapshot = Response::new(status, body);
        snapshot.headers = headers;
        Ok(snapshot)
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &BTreeMap<String, String>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        let url = self.resolve(&request.url)?;
        debug!("{} {}", request.method, url);

        let agent = self.agent.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &url, &request))
            .await
            .map_err(|e| PrecacheError::Internal(format!("network task failed: {}", e)))?
    }
}
