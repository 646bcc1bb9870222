//! VAPID (RFC 8292) request signing.
//!
//! Each delivery carries `Authorization: vapid t=<jwt>, k=<public key>`.
//! The JWT is ES256-signed, scoped to the push service origin, and
//! expires well inside the 24h ceiling push services enforce.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use super::PushError;
use crate::config::VapidConfig;

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: String,
    exp: i64,
    sub: &'a str,
}

pub struct VapidSigner {
    subject: String,
    public_key: String,
    key: EncodingKey,
}

impl std::fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidSigner")
            .field("subject", &self.subject)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl VapidSigner {
    /// Build a signer from a PKCS#8 PEM private key.
    pub fn from_pem(subject: &str, public_key: &str, pem: &[u8]) -> Result<Self, PushError> {
        if !(subject.starts_with("mailto:") || subject.starts_with("https:")) {
            return Err(PushError::Vapid(format!(
                "subject must be a mailto: or https: URI, got {subject}"
            )));
        }
        let raw = URL_SAFE_NO_PAD
            .decode(public_key.trim().trim_end_matches('='))
            .map_err(|e| PushError::Vapid(format!("public key is not base64url: {e}")))?;
        if raw.len() != 65 || raw[0] != 0x04 {
            return Err(PushError::Vapid(
                "public key must be an uncompressed P-256 point".into(),
            ));
        }
        let key = EncodingKey::from_ec_pem(pem)
            .map_err(|e| PushError::Vapid(format!("private key: {e}")))?;
        verify_key_pair(&key, &raw)?;

        Ok(Self {
            subject: subject.to_string(),
            public_key: URL_SAFE_NO_PAD.encode(&raw),
            key,
        })
    }

    /// Load the signer described by the application config.
    pub fn load(config: &VapidConfig) -> Result<Self, PushError> {
        let pem = std::fs::read(&config.private_key_path).map_err(|e| {
            PushError::Vapid(format!(
                "cannot read {}: {e}",
                config.private_key_path.display()
            ))
        })?;
        Self::from_pem(&config.subject, &config.public_key, &pem)
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// `Authorization` header value for a delivery to `endpoint`.
    pub fn authorization(&self, endpoint: &str, now_unix: i64) -> Result<String, PushError> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| PushError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let claims = VapidClaims {
            aud: url.origin().ascii_serialization(),
            exp: now_unix + TOKEN_TTL_SECS,
            sub: &self.subject,
        };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &self.key)
            .map_err(|e| PushError::Vapid(format!("signing failed: {e}")))?;
        Ok(format!("vapid t={token}, k={}", self.public_key))
    }
}

/// Sign a throwaway token with `key` and check it against the raw
/// uncompressed public point (`0x04 || X || Y`).
fn verify_key_pair(key: &EncodingKey, public_point: &[u8]) -> Result<(), PushError> {
    let (x, y) = public_point[1..].split_at(32);
    let public = DecodingKey::from_ec_components(&URL_SAFE_NO_PAD.encode(x), &URL_SAFE_NO_PAD.encode(y))
        .map_err(|e| PushError::Vapid(format!("public key: {e}")))?;

    let claims = VapidClaims {
        aud: "key-check".to_string(),
        exp: 0,
        sub: "key-check",
    };
    let token = encode(&Header::new(Algorithm::ES256), &claims, key)
        .map_err(|e| PushError::Vapid(format!("signing failed: {e}")))?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<serde_json::Value>(&token, &public, &validation)
        .map(|_| ())
        .map_err(|_| PushError::Vapid("public key does not match the private key".into()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::VapidSigner;

    pub const PRIVATE_PEM: &str = include_str!("../../resources/test/vapid_private.pem");
    pub const PUBLIC_PEM: &str = include_str!("../../resources/test/vapid_public.pem");
    pub const PUBLIC_KEY: &str =
        "BC27YHejP6TR3SFr710u4tlD7soUZTaatoIJbxWQJNmkjLjicnPerDMLykSSqEjGzTYCzrQ2PCYGqQ8iB621FxQ";

    pub fn signer() -> VapidSigner {
        VapidSigner::from_pem("mailto:ops@example.com", PUBLIC_KEY, PRIVATE_PEM.as_bytes()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn header_has_token_and_key() {
        let header = signer()
            .authorization("https://fcm.googleapis.com/fcm/send/abc", chrono::Utc::now().timestamp())
            .unwrap();
        assert!(header.starts_with("vapid t="));
        assert!(header.ends_with(&format!(", k={PUBLIC_KEY}")));
    }

    #[test]
    fn token_verifies_with_origin_audience() {
        let now = chrono::Utc::now().timestamp();
        let header = signer()
            .authorization("https://updates.push.services.mozilla.com/wpush/v2/xyz", now)
            .unwrap();
        let token = header
            .trim_start_matches("vapid t=")
            .split(", k=")
            .next()
            .unwrap();

        let key = DecodingKey::from_ec_pem(PUBLIC_PEM.as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_audience(&["https://updates.push.services.mozilla.com"]);
        let data = decode::<serde_json::Value>(token, &key, &validation).unwrap();

        assert_eq!(data.claims["sub"], "mailto:ops@example.com");
        assert_eq!(data.claims["exp"], now + TOKEN_TTL_SECS);
    }

    #[test]
    fn rejects_bad_subject() {
        let err = VapidSigner::from_pem("ops@example.com", PUBLIC_KEY, PRIVATE_PEM.as_bytes())
            .unwrap_err();
        assert!(matches!(err, PushError::Vapid(_)));
    }

    #[test]
    fn rejects_bad_public_key() {
        let err = VapidSigner::from_pem("mailto:ops@example.com", "AAAA", PRIVATE_PEM.as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("uncompressed"));
    }

    #[test]
    fn rejects_public_key_from_another_pair() {
        let other = "BAiLvRcjJGOQB3oCxDFqUTPpCRU9fRb3lKW_Jd5zAaz5GNIbUdudpBVn82Bf-cpCYKspw7MlQULSGduEKcxWAnA";
        let err = VapidSigner::from_pem("mailto:ops@example.com", other, PRIVATE_PEM.as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn load_reports_missing_file() {
        let config = VapidConfig {
            subject: "mailto:ops@example.com".into(),
            public_key: PUBLIC_KEY.into(),
            private_key_path: "/nonexistent/vapid.pem".into(),
        };
        let err = VapidSigner::load(&config).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vapid.pem"));
    }
}
