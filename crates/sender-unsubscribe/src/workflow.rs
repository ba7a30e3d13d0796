//! Automatic unsubscribe and sender status update.

use database::{extract_email_address, newsletter, NewsletterStatus, SqlitePool};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn, Instrument, Span};
use url::Url;

use crate::config::UnsubscribeConfig;
use crate::error::{TransportError, UnsubscribeError};
use crate::link::http_unsubscribe_url;
use crate::safe_url::{is_safe_external_http_url, parse_safe_url};
use crate::transport::{HopRequest, HttpMethod, HttpTransport, UnsubscribeTransport};

/// Input for [`Unsubscriber::unsubscribe_sender_and_mark`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubscribeRequest {
    pub email_account_id: String,
    /// Sender as seen in the `From` header; a display name is allowed.
    pub newsletter_email: String,
    pub unsubscribe_link: Option<String>,
    /// Raw RFC 2369 `List-Unsubscribe` header value.
    pub list_unsubscribe_header: Option<String>,
}

/// Why an unsubscribe did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeFailure {
    NoUnsubscribeUrl,
    UnsafeUnsubscribeUrl,
    RequestTimeout,
    RequestFailed,
    /// A response arrived but was not 2xx, or the redirect budget ran out.
    RequestRejected,
}

/// Network side of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeAttempt {
    /// True once any request was sent.
    pub attempted: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnsubscribeFailure>,
}

/// Result of [`Unsubscriber::unsubscribe_sender_and_mark`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsubscribeOutcome {
    pub unsubscribe: UnsubscribeAttempt,
    /// Sender status written, `None` when nothing was written.
    pub status: Option<NewsletterStatus>,
}

impl UnsubscribeOutcome {
    fn not_attempted(reason: UnsubscribeFailure) -> Self {
        Self {
            unsubscribe: UnsubscribeAttempt {
                attempted: false,
                success: false,
                method: None,
                status_code: None,
                reason: Some(reason),
            },
            status: None,
        }
    }
}

/// Result of one POST or GET attempt, redirects included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttemptResult {
    success: bool,
    status_code: Option<u16>,
    reason: Option<UnsubscribeFailure>,
}

impl AttemptResult {
    fn succeeded(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            reason: None,
        }
    }

    fn failed(reason: UnsubscribeFailure, status_code: Option<u16>) -> Self {
        Self {
            success: false,
            status_code,
            reason: Some(reason),
        }
    }
}

/// Runs automatic unsubscribes and records the result on the sender.
pub struct Unsubscriber<T> {
    pool: SqlitePool,
    transport: T,
    config: UnsubscribeConfig,
}

impl Unsubscriber<HttpTransport> {
    /// Create an unsubscriber that talks to the network.
    pub fn with_http(pool: SqlitePool, config: UnsubscribeConfig) -> Result<Self, UnsubscribeError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(pool, transport, config))
    }
}

impl<T: UnsubscribeTransport> Unsubscriber<T> {
    pub fn new(pool: SqlitePool, transport: T, config: UnsubscribeConfig) -> Self {
        Self {
            pool,
            transport,
            config,
        }
    }

    /// Unsubscribe from a sender and mark it `UNSUBSCRIBED` on success.
    ///
    /// Tries an RFC 8058 one-click POST, then a plain GET. Every URL
    /// contacted, redirect targets included, must pass the safe-URL check.
    /// The sender record is only written after a 2xx response.
    ///
    /// All events are emitted inside `logger`.
    ///
    /// # Errors
    ///
    /// Fails when no address can be extracted from `newsletter_email`, or
    /// when writing the sender status fails. Network problems are reported
    /// through [`UnsubscribeAttempt::reason`].
    pub async fn unsubscribe_sender_and_mark(
        &self,
        request: &UnsubscribeRequest,
        logger: &Span,
    ) -> Result<UnsubscribeOutcome, UnsubscribeError> {
        self.run(request).instrument(logger.clone()).await
    }

    async fn run(&self, request: &UnsubscribeRequest) -> Result<UnsubscribeOutcome, UnsubscribeError> {
        let email = extract_email_address(&request.newsletter_email).map_err(|source| {
            UnsubscribeError::InvalidSenderEmail {
                email: request.newsletter_email.clone(),
                source,
            }
        })?;

        let Some(candidate) = http_unsubscribe_url(
            request.unsubscribe_link.as_deref(),
            request.list_unsubscribe_header.as_deref(),
        ) else {
            info!(email = %email, "No HTTP unsubscribe URL for sender");
            return Ok(UnsubscribeOutcome::not_attempted(
                UnsubscribeFailure::NoUnsubscribeUrl,
            ));
        };

        let Some(url) = parse_safe_url(&candidate) else {
            warn!(email = %email, url = %candidate, "Refusing unsafe unsubscribe URL");
            return Ok(UnsubscribeOutcome::not_attempted(
                UnsubscribeFailure::UnsafeUnsubscribeUrl,
            ));
        };

        let post = self.attempt(&url, HttpMethod::Post).await;
        let (method, result) = if post.success {
            (HttpMethod::Post, post)
        } else {
            debug!(email = %email, reason = ?post.reason, "One-click POST failed, trying GET");
            let get = self.attempt(&url, HttpMethod::Get).await;
            if !get.success {
                let reason = get.reason.or(post.reason);
                warn!(email = %email, reason = ?reason, "Automatic unsubscribe failed");
                return Ok(UnsubscribeOutcome {
                    unsubscribe: UnsubscribeAttempt {
                        attempted: true,
                        success: false,
                        method: None,
                        status_code: get.status_code,
                        reason,
                    },
                    status: None,
                });
            }
            (HttpMethod::Get, get)
        };

        newsletter::set_sender_status(
            &self.pool,
            &request.email_account_id,
            &email,
            Some(NewsletterStatus::Unsubscribed),
        )
        .await?;

        info!(
            email = %email,
            method = ?method,
            status_code = ?result.status_code,
            "Unsubscribed from sender"
        );

        Ok(UnsubscribeOutcome {
            unsubscribe: UnsubscribeAttempt {
                attempted: true,
                success: true,
                method: Some(method),
                status_code: result.status_code,
                reason: None,
            },
            status: Some(NewsletterStatus::Unsubscribed),
        })
    }

    async fn attempt(&self, url: &Url, method: HttpMethod) -> AttemptResult {
        let chain = self.follow_redirects(url.clone(), method);
        match self.config.attempt_deadline {
            Some(deadline) => timeout(deadline, chain).await.unwrap_or_else(|_| {
                warn!(url = %url, "Unsubscribe attempt exceeded its deadline");
                AttemptResult::failed(UnsubscribeFailure::RequestTimeout, None)
            }),
            None => chain.await,
        }
    }

    /// Send `method` to `url`, following up to `max_redirects` hops.
    ///
    /// 301/302/303 after a POST continue as GET; 307/308 keep the method.
    async fn follow_redirects(&self, mut url: Url, mut method: HttpMethod) -> AttemptResult {
        let mut hops = 0;

        loop {
            let request = HopRequest::new(method, url.clone());
            let sent = timeout(self.config.request_timeout, self.transport.send(&request)).await;

            let response = match sent {
                Ok(Ok(response)) => response,
                Ok(Err(TransportError::Timeout)) | Err(_) => {
                    debug!(url = %url, "Unsubscribe request timed out");
                    return AttemptResult::failed(UnsubscribeFailure::RequestTimeout, None);
                }
                Ok(Err(TransportError::UnsafeTarget(host))) => {
                    warn!(host = %host, "Unsubscribe host resolves to a private address");
                    return AttemptResult::failed(UnsubscribeFailure::UnsafeUnsubscribeUrl, None);
                }
                Ok(Err(TransportError::Failed(message))) => {
                    debug!(url = %url, error = %message, "Unsubscribe request failed");
                    return AttemptResult::failed(UnsubscribeFailure::RequestFailed, None);
                }
            };

            if response.is_success() {
                return AttemptResult::succeeded(response.status);
            }

            let location = match response.location.as_deref() {
                Some(location) if response.is_redirect() => location,
                _ => {
                    return AttemptResult::failed(
                        UnsubscribeFailure::RequestRejected,
                        Some(response.status),
                    )
                }
            };

            if hops >= self.config.max_redirects {
                warn!(url = %url, hops, "Too many unsubscribe redirects");
                return AttemptResult::failed(
                    UnsubscribeFailure::RequestRejected,
                    Some(response.status),
                );
            }

            let next = match url.join(location) {
                Ok(next) => next,
                Err(e) => {
                    debug!(location, error = %e, "Unparsable redirect location");
                    return AttemptResult::failed(
                        UnsubscribeFailure::RequestRejected,
                        Some(response.status),
                    );
                }
            };

            if !is_safe_external_http_url(&next) {
                warn!(from = %url, to = %next, "Refusing unsafe unsubscribe redirect");
                return AttemptResult::failed(
                    UnsubscribeFailure::UnsafeUnsubscribeUrl,
                    Some(response.status),
                );
            }

            if method == HttpMethod::Post && matches!(response.status, 301 | 302 | 303) {
                method = HttpMethod::Get;
            }

            debug!(from = %url, to = %next, status = response.status, "Following redirect");
            url = next;
            hops += 1;
        }
    }
}
