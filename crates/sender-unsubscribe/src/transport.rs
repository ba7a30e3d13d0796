//! HTTP transport for unsubscribe requests.
//!
//! The workflow drives redirects itself, so a transport performs exactly one
//! request per call and never follows `Location` on its own.

use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::Serialize;
use tokio::net::lookup_host;
use tracing::debug;
use url::{Host, Url};

use crate::config::UnsubscribeConfig;
use crate::error::{TransportError, UnsubscribeError};
use crate::safe_url::is_private_ip;

/// RFC 8058 one-click request body.
pub const ONE_CLICK_BODY: &str = "List-Unsubscribe=One-Click";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request method of an unsubscribe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Post,
    Get,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Get => reqwest::Method::GET,
        }
    }
}

/// One outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Form body; only POST carries one.
    pub body: Option<&'static str>,
}

impl HopRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        let body = match method {
            HttpMethod::Post => Some(ONE_CLICK_BODY),
            HttpMethod::Get => None,
        };
        Self { method, url, body }
    }
}

/// What the workflow needs to know about a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    /// Raw `Location` header, if any.
    pub location: Option<String>,
}

impl HopResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            location: None,
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            location: Some(location.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Sends a single unsubscribe request.
#[async_trait]
pub trait UnsubscribeTransport: Send + Sync {
    async fn send(&self, request: &HopRequest) -> Result<HopResponse, TransportError>;
}

/// [`UnsubscribeTransport`] backed by `reqwest` with redirects disabled.
///
/// Domain names go through [`PublicResolver`], so the client only ever
/// connects to addresses that passed [`is_private_ip`]. IP literals never
/// reach a resolver and are checked before sending.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new transport.
    pub fn new(config: &UnsubscribeConfig) -> Result<Self, UnsubscribeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .redirect(Policy::none())
            .dns_resolver(Arc::new(PublicResolver))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UnsubscribeTransport for HttpTransport {
    async fn send(&self, request: &HopRequest) -> Result<HopResponse, TransportError> {
        ensure_public_literal(&request.url)?;

        debug!(method = ?request.method, url = %request.url, "Sending unsubscribe request");

        let mut builder = self
            .client
            .request(request.method.as_reqwest(), request.url.clone())
            .header(ACCEPT, "*/*");
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body);
        }

        let response = builder.send().await.map_err(classify_error)?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(HopResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}

/// Refuse IP-literal hosts that point inside.
fn ensure_public_literal(url: &Url) -> Result<(), TransportError> {
    let ip = match url.host() {
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
        Some(Host::Domain(_)) => return Ok(()),
        None => return Err(TransportError::UnsafeTarget(url.to_string())),
    };

    if is_private_ip(&ip) {
        return Err(TransportError::UnsafeTarget(ip.to_string()));
    }
    Ok(())
}

/// Resolution failures reported by [`PublicResolver`].
#[derive(Debug, thiserror::Error)]
pub(crate) enum ResolveError {
    #[error("failed to resolve {host}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{host} resolves only to private addresses")]
    PrivateOnly { host: String },
}

/// DNS resolver that drops private addresses.
///
/// The connector uses exactly the addresses returned here, so a name cannot
/// be checked against one answer and connected with another.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolve_public(&host).await?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, ResolveError> {
    let resolved = lookup_host((host, 0))
        .await
        .map_err(|source| ResolveError::Lookup {
            host: host.to_string(),
            source,
        })?;

    let (private, public): (Vec<SocketAddr>, Vec<SocketAddr>) =
        resolved.partition(|addr| is_private_ip(&addr.ip()));

    if !private.is_empty() {
        debug!(host, dropped = private.len(), "Dropped private addresses for unsubscribe host");
    }
    if public.is_empty() {
        return Err(ResolveError::PrivateOnly {
            host: host.to_string(),
        });
    }

    Ok(public)
}

/// Map a client error, surfacing resolver refusals as unsafe targets.
fn classify_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }

    let mut source = StdError::source(&e);
    while let Some(err) = source {
        if let Some(refused @ ResolveError::PrivateOnly { .. }) = err.downcast_ref::<ResolveError>() {
            return TransportError::UnsafeTarget(refused.to_string());
        }
        source = err.source();
    }

    TransportError::Failed(e.to_string())
}
