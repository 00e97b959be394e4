//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types. Transport access tokens and service
//! credentials are held as `SecretString` so that any struct deriving `Debug`
//! prints them redacted.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ChannelCredentials {
//!     app_id: String,
//!     token: SecretString,
//! }
//!
//! let creds = ChannelCredentials {
//!     app_id: "app-1".to_string(),
//!     token: SecretString::from("rtc-token"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("rtc-token"));
//! assert_eq!(creds.token.expose_secret(), "rtc-token");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("rtc-token-abc");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("rtc-token-abc"));
    }

    #[test]
    fn test_deserialized_token_stays_redacted() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Descriptor {
            channel_name: String,
            token: SecretString,
        }

        let json = r#"{"channel_name": "physics-101", "token": "tok-xyz"}"#;
        let descriptor: Descriptor = serde_json::from_str(json).expect("deserialize");

        assert_eq!(descriptor.token.expose_secret(), "tok-xyz");

        let debug = format!("{descriptor:?}");
        assert!(debug.contains("physics-101"));
        assert!(!debug.contains("tok-xyz"));
    }
}
