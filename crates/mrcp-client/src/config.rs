//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/mrcp/config.toml` by default. Every key is optional:
//!
//! ```toml
//! debug = false
//! channel = "32AECB23433801@speechrecog"
//!
//! [server]
//! address = "127.0.0.1:1544"
//! timeout = 5
//! request_timeout = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use mrcp_protocol::DEFAULT_MAX_MESSAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::provider::ProviderConfig;

/// Configuration for the `mrcp` client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Channel used by `mrcp send` when `--channel` is not given.
    pub channel: Option<String>,

    /// Server/connection settings.
    pub server: ServerSettings,
}

/// Server/connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// `host:port` of the MRCPv2 server.
    pub address: String,

    /// Connect timeout in seconds.
    pub timeout: u64,

    /// Seconds to wait for a response or completion. 0 waits forever.
    pub request_timeout: u64,

    /// Largest message accepted or sent.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{}", mrcp_server::DEFAULT_PORT),
            timeout: 5,
            request_timeout: 30,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mrcp")
    }

    /// Connection settings for [`MrcpProvider::connect`](crate::MrcpProvider::connect).
    pub fn provider_config(&self) -> ProviderConfig {
        let request_timeout = match self.server.request_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        ProviderConfig {
            connect_timeout: Duration::from_secs(self.server.timeout),
            request_timeout,
            max_message_size: self.server.max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert!(!config.debug);
        assert_eq!(config.channel, None);
        assert_eq!(config.server.address, "127.0.0.1:1544");
        assert_eq!(config.server.timeout, 5);

        let provider = config.provider_config();
        assert_eq!(provider.connect_timeout, Duration::from_secs(5));
        assert_eq!(provider.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
channel = "abc@speechsynth"

[server]
address = "10.0.0.5:1544"
request_timeout = 0
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.channel.as_deref(), Some("abc@speechsynth"));
        assert_eq!(config.server.address, "10.0.0.5:1544");
        assert_eq!(config.server.timeout, 5);
        assert_eq!(config.provider_config().request_timeout, None);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = 12").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.contains("failed to parse"));

        let missing = dir.path().join("missing.toml");
        assert!(ClientConfig::load_from(&missing).unwrap_err().contains("failed to read"));
    }

    #[test]
    fn dump_round_trips() {
        let mut config = ClientConfig::default();
        config.channel = Some("x@recorder".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        let back: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.channel, config.channel);
        assert_eq!(back.server.address, config.server.address);
    }

    #[test]
    fn default_path_ends_with_mrcp() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("mrcp/config.toml"));
    }
}
