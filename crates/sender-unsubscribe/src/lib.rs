//! Automatic unsubscribe for newsletter senders.
//!
//! Given a sender and its unsubscribe link or `List-Unsubscribe` header, this
//! crate attempts an RFC 8058 one-click POST (falling back to GET), follows
//! redirects by hand while re-checking every hop against an SSRF filter, and
//! marks the sender `UNSUBSCRIBED` once a request succeeds.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use sender_unsubscribe::{UnsubscribeConfig, UnsubscribeRequest, Unsubscriber};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:inbox.db?mode=rwc").await?;
//! db.migrate().await?;
//!
//! let unsubscriber = Unsubscriber::with_http(db.pool().clone(), UnsubscribeConfig::default())?;
//! let request = UnsubscribeRequest {
//!     email_account_id: "account-1".to_string(),
//!     newsletter_email: "Weekly <news@example.com>".to_string(),
//!     list_unsubscribe_header: Some("<https://example.com/unsubscribe?id=1>".to_string()),
//!     ..Default::default()
//! };
//!
//! let span = tracing::info_span!("unsubscribe", account = "account-1");
//! let outcome = unsubscriber.unsubscribe_sender_and_mark(&request, &span).await?;
//! println!("{}", outcome.unsubscribe.success);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod link;
pub mod safe_url;
pub mod transport;
mod workflow;

pub use config::{ConfigError, UnsubscribeConfig};
pub use error::{TransportError, UnsubscribeError};
pub use link::http_unsubscribe_url;
pub use safe_url::{is_private_ip, is_safe_external_http_url, parse_safe_url};
pub use transport::{
    HopRequest, HopResponse, HttpMethod, HttpTransport, UnsubscribeTransport, ONE_CLICK_BODY,
};
pub use workflow::{
    UnsubscribeAttempt, UnsubscribeFailure, UnsubscribeOutcome, UnsubscribeRequest, Unsubscriber,
};

// Re-export async_trait for custom transports
pub use async_trait::async_trait;
