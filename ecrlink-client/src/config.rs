//! Link configuration.
//!
//! Configuration loads from a YAML file, then environment variables prefixed
//! `ECRLINK_` override individual values. All sections have defaults, so an
//! empty file (or no file at all) yields a working network configuration
//! pointing at a terminal on localhost.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ecrlink_protocol::{Integrity, DEFAULT_PORT, MAX_FRAME_PAYLOAD};

/// Which physical channel carries the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// RS-232 line.
    Serial,
    /// TCP connection.
    #[default]
    Network,
    /// Bluetooth RFCOMM node.
    Wireless,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Serial => write!(f, "serial"),
            ChannelKind::Network => write!(f, "network"),
            ChannelKind::Wireless => write!(f, "wireless"),
        }
    }
}

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_serial_device")]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// `none`, `even` or `odd`.
    #[serde(default = "default_parity")]
    pub parity: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            device: default_serial_device(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
        }
    }
}

/// TCP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Bluetooth RFCOMM settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessConfig {
    /// Terminal MAC address, `aa:bb:cc:dd:ee:ff`.
    #[serde(default)]
    pub address: String,
    /// Bound RFCOMM device node.
    #[serde(default = "default_rfcomm_device")]
    pub device: String,
}

impl Default for WirelessConfig {
    fn default() -> Self {
        WirelessConfig {
            address: String::new(),
            device: default_rfcomm_device(),
        }
    }
}

/// Complete link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommConfig {
    #[serde(default)]
    pub kind: ChannelKind,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub wireless: WirelessConfig,
    /// Whole-exchange deadline in milliseconds. `-1` waits forever, which
    /// serial and network links allow but wireless links do not.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    /// How many NAKs a single frame may draw before the exchange gives up.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Largest frame payload to send, bytes.
    #[serde(default = "default_max_frame_payload")]
    pub max_frame_payload: usize,
    #[serde(default)]
    pub integrity: Integrity,
}

impl Default for CommConfig {
    fn default() -> Self {
        CommConfig {
            kind: ChannelKind::default(),
            serial: SerialConfig::default(),
            network: NetworkConfig::default(),
            wireless: WirelessConfig::default(),
            timeout_ms: default_timeout_ms(),
            retry_limit: default_retry_limit(),
            max_frame_payload: default_max_frame_payload(),
            integrity: Integrity::default(),
        }
    }
}

fn default_serial_device() -> String {
    "/dev/ttyS0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_rfcomm_device() -> String {
    "/dev/rfcomm0".to_string()
}

fn default_timeout_ms() -> i64 {
    60_000
}

fn default_retry_limit() -> u32 {
    3
}

fn default_max_frame_payload() -> usize {
    MAX_FRAME_PAYLOAD
}

impl CommConfig {
    /// Loads configuration from a file if present, otherwise starts from
    /// defaults; environment overrides apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => CommConfig::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: CommConfig = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = serde_yaml::to_string(self).map_err(ConfigError::Parse)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Environment variables override file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(kind) = std::env::var("ECRLINK_KIND") {
            match kind.as_str() {
                "serial" => self.kind = ChannelKind::Serial,
                "network" => self.kind = ChannelKind::Network,
                "wireless" => self.kind = ChannelKind::Wireless,
                _ => {}
            }
        }
        if let Ok(host) = std::env::var("ECRLINK_HOST") {
            self.network.host = host;
        }
        if let Ok(port) = std::env::var("ECRLINK_PORT") {
            if let Ok(port) = port.parse() {
                self.network.port = port;
            }
        }
        if let Ok(device) = std::env::var("ECRLINK_DEVICE") {
            self.serial.device = device;
        }
        if let Ok(baud) = std::env::var("ECRLINK_BAUD_RATE") {
            if let Ok(baud) = baud.parse() {
                self.serial.baud_rate = baud;
            }
        }
        if let Ok(timeout) = std::env::var("ECRLINK_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.timeout_ms = timeout;
            }
        }
        if let Ok(retries) = std::env::var("ECRLINK_RETRY_LIMIT") {
            if let Ok(retries) = retries.parse() {
                self.retry_limit = retries;
            }
        }
    }

    /// Rejects configurations the link cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < -1 || self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "timeout_ms must be positive or -1, got {}",
                self.timeout_ms
            )));
        }
        if self.retry_limit == 0 {
            return Err(ConfigError::Invalid(
                "retry_limit must be at least 1".to_string(),
            ));
        }
        if self.max_frame_payload == 0 || self.max_frame_payload > MAX_FRAME_PAYLOAD {
            return Err(ConfigError::Invalid(format!(
                "max_frame_payload must be within 1..={}, got {}",
                MAX_FRAME_PAYLOAD, self.max_frame_payload
            )));
        }
        match self.kind {
            ChannelKind::Network => {
                if self.network.host.parse::<IpAddr>().is_err() {
                    return Err(ConfigError::Invalid(format!(
                        "network.host \"{}\" is not an IPv4/IPv6 literal",
                        self.network.host
                    )));
                }
                if self.network.port == 0 {
                    return Err(ConfigError::Invalid("network.port is zero".to_string()));
                }
            }
            ChannelKind::Serial => {
                if self.serial.device.is_empty() {
                    return Err(ConfigError::Invalid("serial.device is empty".to_string()));
                }
                if self.serial.baud_rate == 0 {
                    return Err(ConfigError::Invalid("serial.baud_rate is zero".to_string()));
                }
                if !(5..=8).contains(&self.serial.data_bits) {
                    return Err(ConfigError::Invalid(format!(
                        "serial.data_bits must be 5-8, got {}",
                        self.serial.data_bits
                    )));
                }
                if !(1..=2).contains(&self.serial.stop_bits) {
                    return Err(ConfigError::Invalid(format!(
                        "serial.stop_bits must be 1 or 2, got {}",
                        self.serial.stop_bits
                    )));
                }
                if !matches!(self.serial.parity.as_str(), "none" | "even" | "odd") {
                    return Err(ConfigError::Invalid(format!(
                        "serial.parity must be none, even or odd, got \"{}\"",
                        self.serial.parity
                    )));
                }
            }
            ChannelKind::Wireless => {
                if !is_mac_address(&self.wireless.address) {
                    return Err(ConfigError::Invalid(format!(
                        "wireless.address \"{}\" is not a MAC address",
                        self.wireless.address
                    )));
                }
                if self.wireless.device.is_empty() {
                    return Err(ConfigError::Invalid("wireless.device is empty".to_string()));
                }
                if self.timeout_ms == -1 {
                    return Err(ConfigError::Invalid(
                        "wireless links require a finite timeout_ms".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Exchange deadline; `None` waits forever.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == -1 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms as u64))
        }
    }

    /// Human-readable endpoint for logs.
    pub fn target(&self) -> String {
        match self.kind {
            ChannelKind::Serial => self.serial.device.clone(),
            ChannelKind::Network => format!("{}:{}", self.network.host, self.network.port),
            ChannelKind::Wireless => {
                format!("{} ({})", self.wireless.device, self.wireless.address)
            }
        }
    }
}

fn is_mac_address(s: &str) -> bool {
    let mut parts = 0;
    for part in s.split(':') {
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        parts += 1;
    }
    parts == 6
}

/// Configuration load or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CommConfig::default();
        assert_eq!(config.kind, ChannelKind::Network);
        assert_eq!(config.network.port, DEFAULT_PORT);
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.max_frame_payload, 141);
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.yaml");

        let mut config = CommConfig::default();
        config.kind = ChannelKind::Serial;
        config.serial.device = "/dev/ttyUSB3".to_string();
        config.serial.baud_rate = 115_200;
        config.timeout_ms = -1;
        config.integrity = Integrity::Crc32c;
        config.save(&path).unwrap();

        let loaded = CommConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: CommConfig = serde_yaml::from_str("network:\n  host: 10.0.0.7\n").unwrap();
        assert_eq!(config.network.host, "10.0.0.7");
        assert_eq!(config.network.port, DEFAULT_PORT);
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.integrity, Integrity::Lrc);
    }

    #[test]
    fn test_timeout_conversion() {
        let mut config = CommConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_millis(60_000)));
        config.timeout_ms = -1;
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let mut config = CommConfig::default();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.timeout_ms = -2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wireless_requires_finite_timeout_and_mac() {
        let mut config = CommConfig::default();
        config.kind = ChannelKind::Wireless;
        config.wireless.address = "00:11:22:33:44:55".to_string();
        config.validate().unwrap();

        config.timeout_ms = -1;
        assert!(config.validate().is_err());

        config.timeout_ms = 60_000;
        config.wireless.address = "not-a-mac".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_ip_host() {
        let mut config = CommConfig::default();
        config.network.host = "10.0.0.7:10009".to_string();
        assert!(config.validate().is_err());
        config.network.host = "terminal.example".to_string();
        assert!(config.validate().is_err());
        config.network.host = "::1".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_oversize_frame_payload() {
        let mut config = CommConfig::default();
        config.max_frame_payload = 142;
        assert!(config.validate().is_err());
        config.max_frame_payload = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serial_validation() {
        let mut config = CommConfig::default();
        config.kind = ChannelKind::Serial;
        config.validate().unwrap();

        config.serial.data_bits = 9;
        assert!(config.validate().is_err());
        config.serial.data_bits = 8;
        config.serial.parity = "mark".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_rendering() {
        let config = CommConfig::default();
        assert_eq!(config.target(), "127.0.0.1:10009");
    }
}
