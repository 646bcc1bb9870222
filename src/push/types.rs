use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::PushError;

/// Length of an uncompressed P-256 point (0x04 || X || Y).
const P256_POINT_LEN: usize = 65;
/// Length of the client authentication secret.
const AUTH_SECRET_LEN: usize = 16;

/// Role assigned when a subscriber does not name one.
pub const DEFAULT_ROLE: &str = "admin";

/// Client encryption keys, as the browser's `PushSubscription.toJSON()`
/// reports them (base64url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

impl SubscriptionKeys {
    /// Decoded receiver public key (65 bytes).
    pub fn public_key(&self) -> Result<Vec<u8>, PushError> {
        let bytes = decode_base64url(&self.p256dh)
            .ok_or_else(|| PushError::InvalidKeys("p256dh is not base64url".into()))?;
        if bytes.len() != P256_POINT_LEN || bytes[0] != 0x04 {
            return Err(PushError::InvalidKeys(format!(
                "p256dh must be an uncompressed P-256 point, got {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Decoded authentication secret (16 bytes).
    pub fn auth_secret(&self) -> Result<Vec<u8>, PushError> {
        let bytes = decode_base64url(&self.auth)
            .ok_or_else(|| PushError::InvalidKeys("auth is not base64url".into()))?;
        if bytes.len() != AUTH_SECRET_LEN {
            return Err(PushError::InvalidKeys(format!(
                "auth secret must be {AUTH_SECRET_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    pub fn validate(&self) -> Result<(), PushError> {
        self.public_key()?;
        self.auth_secret()?;
        Ok(())
    }
}

/// Browsers differ on padding, so accept both forms.
fn decode_base64url(value: &str) -> Option<Vec<u8>> {
    let trimmed = value.trim();
    URL_SAFE_NO_PAD
        .decode(trimmed.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(trimmed))
        .ok()
}

/// A stored push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    /// Milliseconds since the Unix epoch, when the browser reports one.
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl PushSubscription {
    /// Checks endpoint shape, key encoding and role before storage.
    pub fn validate(&self) -> Result<(), PushError> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| PushError::InvalidEndpoint(format!("{}: {e}", self.endpoint)))?;
        let local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
        match url.scheme() {
            "https" => {}
            "http" if local => {}
            other => {
                return Err(PushError::InvalidEndpoint(format!(
                    "unsupported scheme {other} in {}",
                    self.endpoint
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(PushError::InvalidEndpoint(format!("no host in {}", self.endpoint)));
        }
        if self.role.trim().is_empty() {
            return Err(PushError::InvalidRole);
        }
        self.keys.validate()
    }
}

/// Notification shown by the subscriber's service worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: None,
            tag: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PushError> {
        serde_json::to_vec(self).map_err(|e| PushError::Payload(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A syntactically valid key pair (the point need not lie on the curve
    /// for storage tests).
    pub fn keys() -> SubscriptionKeys {
        let mut point = vec![0x04u8];
        point.extend(std::iter::repeat(7u8).take(64));
        SubscriptionKeys {
            p256dh: URL_SAFE_NO_PAD.encode(&point),
            auth: URL_SAFE_NO_PAD.encode([9u8; 16]),
        }
    }

    pub fn subscription(endpoint: &str, role: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            expiration_time: None,
            keys: keys(),
            role: role.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn browser_json_deserializes() {
        let json = serde_json::json!({
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
            "expirationTime": null,
            "keys": keys(),
        });
        let sub: PushSubscription = serde_json::from_value(json).unwrap();
        assert_eq!(sub.role, DEFAULT_ROLE);
        assert!(sub.expiration_time.is_none());
        sub.validate().unwrap();
    }

    #[test]
    fn padded_keys_are_accepted() {
        let mut k = keys();
        k.auth = URL_SAFE.encode([9u8; 16]);
        assert!(k.auth.ends_with('='));
        assert_eq!(k.auth_secret().unwrap(), vec![9u8; 16]);
    }

    #[test]
    fn short_public_key_rejected() {
        let mut k = keys();
        k.p256dh = URL_SAFE_NO_PAD.encode([4u8; 33]);
        assert!(matches!(k.validate(), Err(PushError::InvalidKeys(_))));
    }

    #[test]
    fn plain_http_endpoint_rejected() {
        let sub = subscription("http://push.example.com/x", "admin");
        assert!(matches!(sub.validate(), Err(PushError::InvalidEndpoint(_))));
    }

    #[test]
    fn localhost_http_endpoint_allowed() {
        let sub = subscription("http://localhost:9000/push/1", "admin");
        sub.validate().unwrap();
    }

    #[test]
    fn blank_role_rejected() {
        let sub = subscription("https://push.example.com/x", "  ");
        assert!(matches!(sub.validate(), Err(PushError::InvalidRole)));
    }

    #[test]
    fn payload_omits_empty_optionals() {
        let bytes = NotificationPayload::new("PO approved", "PO-104 is ready")
            .to_bytes()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["title"], "PO approved");
        assert!(json.get("url").is_none());
    }
}
