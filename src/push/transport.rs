use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};

use super::types::{PushSubscription, SubscriptionKeys};
use super::vapid::VapidSigner;
use super::PushError;

/// Largest plaintext that fits a single 4096-byte aes128gcm record
/// (86-byte header, 16-byte tag, 1-byte padding delimiter).
pub const MAX_PAYLOAD_BYTES: usize = 3993;

/// One delivery of an already-serialized payload to one subscription.
///
/// Returns a boxed future so implementations can sit behind `Arc<dyn _>`.
pub trait PushTransport: Send + Sync {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), PushError>>;
}

/// Delivery priority hint sent in the `Urgency` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    VeryLow,
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very-low",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Encrypt a payload for one receiver (RFC 8291, `aes128gcm`).
pub fn encrypt_payload(keys: &SubscriptionKeys, payload: &[u8]) -> Result<Vec<u8>, PushError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(PushError::Payload(format!(
            "payload is {} bytes, limit is {MAX_PAYLOAD_BYTES}",
            payload.len()
        )));
    }
    let public_key = keys.public_key()?;
    let auth_secret = keys.auth_secret()?;
    ece::encrypt(&public_key, &auth_secret, payload)
        .map_err(|e| PushError::Encryption(e.to_string()))
}

/// Web-push HTTP client: encrypts, signs, and POSTs to the push service.
pub struct WebPushClient {
    client: reqwest::Client,
    signer: VapidSigner,
    ttl_secs: u32,
    urgency: Urgency,
}

impl WebPushClient {
    pub fn new(signer: VapidSigner, ttl_secs: u32, timeout: Duration) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PushError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            signer,
            ttl_secs,
            urgency: Urgency::default(),
        })
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError> {
        let body = encrypt_payload(&subscription.keys, payload)?;
        let authorization = self
            .signer
            .authorization(&subscription.endpoint, chrono::Utc::now().timestamp())?;

        let response = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", self.urgency.as_str())
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PushError::Http(format!("Request to push service timed out: {e}"))
                } else {
                    PushError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PushError::Endpoint {
            status: status.as_u16(),
            body,
        })
    }
}

impl PushTransport for WebPushClient {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), PushError>> {
        Box::pin(self.send(subscription, payload))
    }
}

/// Mock transport for testing: answers each endpoint with a configured
/// status (default 201) and records every delivery.
#[derive(Default)]
pub struct MockTransport {
    statuses: HashMap<String, u16>,
    unreachable: Vec<String>,
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `endpoint` with `status`.
    pub fn with_status(mut self, endpoint: &str, status: u16) -> Self {
        self.statuses.insert(endpoint.to_string(), status);
        self
    }

    /// Fail `endpoint` with a network error.
    pub fn with_unreachable(mut self, endpoint: &str) -> Self {
        self.unreachable.push(endpoint.to_string());
        self
    }

    /// Endpoints that were attempted, in completion order.
    pub fn attempted(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|d| d.iter().map(|(e, _)| e.clone()).collect())
            .unwrap_or_default()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.delivered
            .lock()
            .map(|d| d.iter().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }
}

impl PushTransport for MockTransport {
    fn deliver<'a>(
        &'a self,
        subscription: &'a PushSubscription,
        payload: &'a [u8],
    ) -> BoxFuture<'a, Result<(), PushError>> {
        Box::pin(async move {
            if let Ok(mut log) = self.delivered.lock() {
                log.push((subscription.endpoint.clone(), payload.to_vec()));
            }
            if self.unreachable.contains(&subscription.endpoint) {
                return Err(PushError::Http("connection refused".into()));
            }
            let status = self.statuses.get(&subscription.endpoint).copied().unwrap_or(201);
            if (200..300).contains(&status) {
                Ok(())
            } else {
                Err(PushError::Endpoint {
                    status,
                    body: String::new(),
                })
            }
        })
    }
}
