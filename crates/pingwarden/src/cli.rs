//! Command line and config file handling.
//!
//! Every setting can come from a flag, a `PINGWARDEN_*` environment
//! variable, or an optional TOML file passed with `--config`. Flags and
//! environment win over the file; the file wins over built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use pingwarden_hass::HassConfig;
use pingwarden_monitor::MonitorConfig;
use pingwarden_monitor::config::{
    DEFAULT_COOLDOWN, DEFAULT_INTERVAL, DEFAULT_MAX_FAILURES, DEFAULT_TIMEOUT,
};

const DEFAULT_HOST: &str = "1.1.1.1";
const DEFAULT_MQTT_ID: &str = "network-monitor";
const DEFAULT_MQTT_NAME: &str = "network-monitor";
const DEFAULT_TOPIC_PREFIX: &str = "homeassistant";

#[derive(Debug, Parser)]
#[command(
    name = "pingwarden",
    about = "Ping a host and run a command when it stops answering",
    version
)]
pub struct Cli {
    /// TOML config file.
    #[arg(long, env = "PINGWARDEN_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Host name to ping (IP address recommended) [default: 1.1.1.1]
    #[arg(long, env = "PINGWARDEN_HOST")]
    pub host: Option<String>,

    /// Interval in milliseconds [default: 3000]
    #[arg(long, env = "PINGWARDEN_INTERVAL", value_name = "MS")]
    pub interval: Option<u64>,

    /// Timeout in milliseconds [default: 1000]
    #[arg(long, env = "PINGWARDEN_TIMEOUT", value_name = "MS")]
    pub timeout: Option<u64>,

    /// Consecutive failures before running the command [default: 5]
    #[arg(long, env = "PINGWARDEN_MAX_FAILURES")]
    pub max_failures: Option<u32>,

    /// Milliseconds to wait after running the command before pinging again [default: 300000]
    #[arg(long, env = "PINGWARDEN_COOLDOWN", value_name = "MS")]
    pub cooldown: Option<u64>,

    /// Use an unprivileged (datagram) ICMP socket.
    #[arg(long, env = "PINGWARDEN_UNPRIVILEGED")]
    pub unprivileged: bool,

    /// Kill the command if it runs longer than this many milliseconds.
    #[arg(long, env = "PINGWARDEN_COMMAND_TIMEOUT", value_name = "MS")]
    pub command_timeout: Option<u64>,

    /// MQTT broker URI. With RabbitMQ the path selects the vhost,
    /// e.g. tcp://test.mosquitto.org:1883/vhost
    #[arg(long, env = "PINGWARDEN_MQTT_URI")]
    pub mqtt_uri: Option<String>,

    /// Unique id of this device [default: network-monitor]
    #[arg(long, env = "PINGWARDEN_MQTT_UNIQUE_ID")]
    pub mqtt_unique_id: Option<String>,

    /// Name of this device [default: network-monitor]
    #[arg(long, env = "PINGWARDEN_MQTT_NAME")]
    pub mqtt_name: Option<String>,

    /// Home Assistant discovery prefix [default: homeassistant]
    #[arg(long, env = "PINGWARDEN_MQTT_TOPIC_PREFIX")]
    pub mqtt_topic_prefix: Option<String>,

    /// Command to run, with its arguments, once the host stays down.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Settings as read from a `--config` file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_failures: Option<u32>,
    pub cooldown_ms: Option<u64>,
    pub unprivileged: Option<bool>,
    pub command_timeout_ms: Option<u64>,
    pub command: Option<Vec<String>>,
    pub mqtt: Option<MqttFileConfig>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MqttFileConfig {
    pub uri: Option<String>,
    pub unique_id: Option<String>,
    pub name: Option<String>,
    pub topic_prefix: Option<String>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub unprivileged: bool,
    pub monitor: MonitorConfig,
    /// `None` when no MQTT URI is configured.
    pub hass: Option<HassConfig>,
}

impl Cli {
    /// Merge flags, the optional config file and defaults, then validate.
    pub fn resolve(self) -> anyhow::Result<Settings> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        let mqtt = file.mqtt.unwrap_or_default();

        let millis = |cli: Option<u64>, file: Option<u64>| cli.or(file).map(Duration::from_millis);

        let command = if self.command.is_empty() {
            file.command.unwrap_or_default()
        } else {
            self.command
        };

        let monitor = MonitorConfig {
            interval: millis(self.interval, file.interval_ms).unwrap_or(DEFAULT_INTERVAL),
            timeout: millis(self.timeout, file.timeout_ms).unwrap_or(DEFAULT_TIMEOUT),
            max_failures: self
                .max_failures
                .or(file.max_failures)
                .unwrap_or(DEFAULT_MAX_FAILURES),
            cooldown: millis(self.cooldown, file.cooldown_ms).unwrap_or(DEFAULT_COOLDOWN),
            command,
            command_timeout: millis(self.command_timeout, file.command_timeout_ms),
        };
        monitor.validate().context("invalid monitor configuration")?;

        let hass = self
            .mqtt_uri
            .or(mqtt.uri)
            .filter(|uri| !uri.trim().is_empty())
            .map(|uri| HassConfig {
                uri,
                unique_id: self
                    .mqtt_unique_id
                    .or(mqtt.unique_id)
                    .unwrap_or_else(|| DEFAULT_MQTT_ID.to_string()),
                name: self
                    .mqtt_name
                    .or(mqtt.name)
                    .unwrap_or_else(|| DEFAULT_MQTT_NAME.to_string()),
                topic_prefix: self
                    .mqtt_topic_prefix
                    .or(mqtt.topic_prefix)
                    .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
                sw_version: env!("CARGO_PKG_VERSION").to_string(),
            });

        Ok(Settings {
            host: self
                .host
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            unprivileged: self.unprivileged || file.unprivileged.unwrap_or(false),
            monitor,
            hass,
        })
    }
}
