//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. Connection strings such as `REDIS_URL` may
//! carry credentials (`redis://:password@host:port`), so configuration keeps
//! them as `SecretString` and only exposes them at the point of connecting.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let url = SecretString::from("redis://:hunter2@localhost:6379");
//! assert!(!format!("{url:?}").contains("hunter2"));
//! assert!(url.expose_secret().starts_with("redis://"));
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_redis_url_password_is_redacted() {
        let url = SecretString::from("redis://:p4ssw0rd@cache.internal:6379");
        let debug_str = format!("{url:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("p4ssw0rd"));
        assert!(!debug_str.contains("cache.internal"));
    }

    #[test]
    fn test_expose_secret_returns_connection_string() {
        let url = SecretString::from("redis://localhost:6379");
        assert_eq!(url.expose_secret(), "redis://localhost:6379");
    }

    #[test]
    fn test_backend_settings_debug_keeps_kind_visible() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct BackendSettings {
            kind: String,
            url: SecretString,
        }

        let json = r#"{"kind": "redis", "url": "redis://:secret@host:6379"}"#;
        let settings: BackendSettings = serde_json::from_str(json).expect("deserialize");

        assert_eq!(settings.url.expose_secret(), "redis://:secret@host:6379");

        let debug = format!("{settings:?}");
        assert!(debug.contains("redis"));
        assert!(!debug.contains(":secret@"));
    }
}
