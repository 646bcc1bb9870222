//! Web-push notification fan-out.
//!
//! Subscriptions are stored per role (`db::subscriptions`). A dispatch
//! reads every subscription for a role, delivers the payload to all of
//! them concurrently, and prunes the ones the push service reports as
//! gone (HTTP 404 / 410). Other failures are logged and left alone.

pub mod dispatcher;
pub mod transport;
pub mod types;
pub mod vapid;

pub use dispatcher::{notify_role, subscribe, unsubscribe, DispatchReport};
pub use transport::{PushTransport, WebPushClient};
pub use types::{NotificationPayload, PushSubscription, SubscriptionKeys};
pub use vapid::VapidSigner;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid subscription keys: {0}")]
    InvalidKeys(String),

    #[error("Subscription role must not be empty")]
    InvalidRole,

    #[error("Payload encoding failed: {0}")]
    Payload(String),

    #[error("Payload encryption failed: {0}")]
    Encryption(String),

    #[error("VAPID error: {0}")]
    Vapid(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Push service returned {status}: {body}")]
    Endpoint { status: u16, body: String },
}

impl PushError {
    /// The push service no longer knows this subscription.
    pub fn is_gone(&self) -> bool {
        matches!(self, PushError::Endpoint { status: 404 | 410, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PushError::Endpoint { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(status: u16) -> PushError {
        PushError::Endpoint { status, body: String::new() }
    }

    #[test]
    fn gone_statuses() {
        assert!(endpoint(404).is_gone());
        assert!(endpoint(410).is_gone());
        assert!(!endpoint(400).is_gone());
        assert!(!endpoint(413).is_gone());
        assert!(!endpoint(429).is_gone());
        assert!(!endpoint(500).is_gone());
        assert!(!PushError::Http("connection refused".into()).is_gone());
    }

    #[test]
    fn status_only_for_endpoint_errors() {
        assert_eq!(endpoint(410).status(), Some(410));
        assert_eq!(PushError::InvalidRole.status(), None);
    }
}
