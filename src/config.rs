use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "bizdocs";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix for every environment variable read by `AppConfig::from_env`.
const ENV_PREFIX: &str = "BIZDOCS_";

/// Default log filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "bizdocs=info,tower_http=info"
}

/// Get the application data directory.
/// Falls back to the working directory when no home directory exists
/// (containers, service accounts).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bizdocs")
}

/// Default SQLite database location.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("bizdocs.db")
}

/// Default directory for generated documents.
pub fn default_output_dir() -> PathBuf {
    app_data_dir().join("documents")
}

/// Default directory for face detection / recognition ONNX models.
pub fn default_face_model_dir() -> PathBuf {
    app_data_dir().join("models").join("face")
}

/// VAPID identity used to sign web-push deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidConfig {
    /// `mailto:` or `https:` contact for the push service operator.
    pub subject: String,
    /// Uncompressed P-256 public key, base64url without padding.
    pub public_key: String,
    /// PKCS#8 PEM file holding the matching private key.
    pub private_key_path: PathBuf,
}

/// Runtime configuration, resolved from `BIZDOCS_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    pub face_model_dir: PathBuf,
    pub vapid: Option<VapidConfig>,
    /// Seconds a push service should retain an undelivered message.
    pub push_ttl_secs: u32,
    pub request_timeout: Duration,
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_path: default_database_path(),
            output_dir: default_output_dir(),
            face_model_dir: default_face_model_dir(),
            vapid: None,
            push_ttl_secs: 24 * 60 * 60,
            request_timeout: Duration::from_secs(30),
            log_filter: default_log_filter().to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Incomplete VAPID configuration: {0} is missing")]
    IncompleteVapid(&'static str),
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    /// The lookup receives full `BIZDOCS_*` variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = parse_value("BIND_ADDR", &addr)?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = get("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(path);
        }
        if let Some(path) = get("FACE_MODEL_DIR") {
            config.face_model_dir = PathBuf::from(path);
        }
        if let Some(ttl) = get("PUSH_TTL_SECS") {
            config.push_ttl_secs = parse_value("PUSH_TTL_SECS", &ttl)?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_value("REQUEST_TIMEOUT_SECS", &secs)?);
        }

        if let Some(filter) = get("LOG") {
            config.log_filter = filter;
        }

        // All three VAPID settings travel together; a partial set is a mistake.
        let subject = get("VAPID_SUBJECT");
        let public_key = get("VAPID_PUBLIC_KEY");
        let private_key_path = get("VAPID_PRIVATE_KEY_PATH");
        config.vapid = match (subject, public_key, private_key_path) {
            (None, None, None) => None,
            (Some(subject), Some(public_key), Some(path)) => Some(VapidConfig {
                subject,
                public_key,
                private_key_path: PathBuf::from(path),
            }),
            (None, _, _) => return Err(ConfigError::IncompleteVapid("VAPID_SUBJECT")),
            (_, None, _) => return Err(ConfigError::IncompleteVapid("VAPID_PUBLIC_KEY")),
            (_, _, None) => return Err(ConfigError::IncompleteVapid("VAPID_PRIVATE_KEY_PATH")),
        };

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_is_hidden_dir() {
        assert!(app_data_dir().ends_with(".bizdocs"));
    }

    #[test]
    fn database_path_under_app_data() {
        assert!(default_database_path().starts_with(app_data_dir()));
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.push_ttl_secs, 86_400);
        assert!(config.vapid.is_none());
        assert_eq!(config.log_filter, default_log_filter());
    }

    #[test]
    fn log_filter_override() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("BIZDOCS_LOG", "bizdocs=debug")])).unwrap();
        assert_eq!(config.log_filter, "bizdocs=debug");
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BIZDOCS_BIND_ADDR", "0.0.0.0:9000"),
            ("BIZDOCS_DATABASE_PATH", "/tmp/x.db"),
            ("BIZDOCS_PUSH_TTL_SECS", "60"),
            ("BIZDOCS_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.push_ttl_secs, 60);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("BIZDOCS_PUSH_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("BIZDOCS_PUSH_TTL_SECS"));
    }

    #[test]
    fn complete_vapid_config() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BIZDOCS_VAPID_SUBJECT", "mailto:ops@example.com"),
            ("BIZDOCS_VAPID_PUBLIC_KEY", "BPub"),
            ("BIZDOCS_VAPID_PRIVATE_KEY_PATH", "/etc/bizdocs/vapid.pem"),
        ]))
        .unwrap();
        let vapid = config.vapid.unwrap();
        assert_eq!(vapid.subject, "mailto:ops@example.com");
        assert_eq!(vapid.private_key_path, PathBuf::from("/etc/bizdocs/vapid.pem"));
    }

    #[test]
    fn partial_vapid_config_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "BIZDOCS_VAPID_SUBJECT",
            "mailto:ops@example.com",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteVapid("VAPID_PUBLIC_KEY")));
    }

    #[test]
    fn app_name_is_bizdocs() {
        assert_eq!(APP_NAME, "bizdocs");
    }
}
