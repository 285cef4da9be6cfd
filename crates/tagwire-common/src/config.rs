//! Runtime configuration.
//!
//! Every tunable the protocol depends on lives here rather than as a
//! literal: the well-known handshake port, the session port range handed to
//! individual connections, the maximum frame length, and the inter-poll
//! interval applied between handler completion and reply send. Defaults
//! match the protocol's historical constants.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::error::{Result, TagwireError};
use crate::transport::frame::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN};

/// Well-known port the handshake listener binds by default.
pub const DEFAULT_LISTEN_PORT: u16 = 23521;
/// First port of the default per-connection session range.
pub const DEFAULT_SESSION_PORT_START: u16 = 25523;
/// Size of the default session port range.
pub const DEFAULT_SESSION_PORT_COUNT: u16 = 1000;
/// Default inter-poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Tunable parameters shared by servers and clients.
///
/// Loadable from a JSON file; absent fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host the listeners bind and clients dial.
    pub listen_host: String,
    /// Well-known handshake port. Port 0 delegates to the OS, which tests
    /// use to avoid collisions.
    pub listen_port: u16,
    /// First port of the per-connection session range. A start of 0 makes
    /// every session listener ephemeral instead of range-allocated.
    pub session_port_start: u16,
    /// Number of ports in the session range.
    pub session_port_count: u16,
    /// Maximum length of one frame on the wire, header included.
    pub max_frame_len: usize,
    /// Interval between handler completion and reply send, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_host: "127.0.0.1".to_owned(),
            listen_port: DEFAULT_LISTEN_PORT,
            session_port_start: DEFAULT_SESSION_PORT_START,
            session_port_count: DEFAULT_SESSION_PORT_COUNT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Loads and validates a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TagwireError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            TagwireError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the rest of the system assumes.
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_len <= FRAME_HEADER_LEN {
            return Err(TagwireError::Config(format!(
                "max_frame_len {} leaves no room for data after the {FRAME_HEADER_LEN}-byte header",
                self.max_frame_len
            )));
        }
        if self.session_port_start != 0 && self.session_port_count == 0 {
            return Err(TagwireError::Config(
                "session_port_count must be nonzero for a fixed session range".into(),
            ));
        }
        Ok(())
    }

    /// The inter-poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The address of the well-known handshake listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let config = Config::default();
        assert_eq!(config.listen_port, 23521);
        assert_eq!(config.session_port_start, 25523);
        assert_eq!(config.session_port_count, 1000);
        assert_eq!(config.max_frame_len, 1400);
        assert_eq!(config.poll_interval_ms, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"listen_port": 9000}"#).unwrap();
        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.max_frame_len, 1400);
    }

    #[test]
    fn test_validate_rejects_tiny_frames() {
        let config = Config {
            max_frame_len: 12,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fixed_range() {
        let config = Config {
            session_port_count: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let ephemeral = Config {
            session_port_start: 0,
            session_port_count: 0,
            ..Config::default()
        };
        assert!(ephemeral.validate().is_ok());
    }
}
