//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// File the settings are persisted to
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Mode tick period in milliseconds
    #[serde(default = "default_tick")]
    pub tick: u64,

    /// Read commands from stdin (end of input shuts the daemon down)
    #[serde(default = "default_console")]
    pub console: bool,

    /// Serial link configuration
    #[serde(default)]
    pub serial: SerialConfig,

    /// Temperature source configuration
    #[serde(default)]
    pub sensors: SensorsConfig,

    /// Text feed configuration
    #[serde(default)]
    pub text: TextConfig,

    /// Standings source configuration
    #[serde(default)]
    pub standings: StandingsConfig,
}

/// Serial link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path
    #[serde(default = "default_port")]
    pub port: String,

    /// Baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Sync cycle period in milliseconds
    #[serde(default = "default_cycle")]
    pub cycle: u64,

    /// ACK wait in milliseconds
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout: u64,

    /// Resend unchanged fields after this many milliseconds
    #[serde(default = "default_refresh")]
    pub refresh: u64,

    /// Wait between open attempts in milliseconds
    #[serde(default = "default_reconnect")]
    pub reconnect: u64,

    /// Wait after opening before the first packet, in milliseconds
    #[serde(default = "default_boot_delay")]
    pub boot_delay: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            cycle: default_cycle(),
            ack_timeout: default_ack_timeout(),
            refresh: default_refresh(),
            reconnect: default_reconnect(),
            boot_delay: default_boot_delay(),
        }
    }
}

/// Temperature log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsConfig {
    /// Log path pattern, expanded with strftime against today's date
    #[serde(default = "default_temps_log")]
    pub temps_log: String,

    /// Minimum time between log reads in milliseconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval: u64,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            temps_log: default_temps_log(),
            sample_interval: default_sample_interval(),
        }
    }
}

/// Text feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// File shown in text mode
    #[serde(default = "default_text_path")]
    pub path: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            path: default_text_path(),
        }
    }
}

/// Standings configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsConfig {
    /// Standings page URL
    #[serde(default = "default_standings_url")]
    pub url: String,

    /// Division to show
    #[serde(default = "default_division")]
    pub division: String,

    /// Fetch interval in milliseconds
    #[serde(default = "default_standings_interval")]
    pub interval: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_standings_timeout")]
    pub timeout: u64,
}

impl Default for StandingsConfig {
    fn default() -> Self {
        Self {
            url: default_standings_url(),
            division: default_division(),
            interval: default_standings_interval(),
            timeout: default_standings_timeout(),
        }
    }
}

// Default value functions
fn default_state_file() -> String {
    "state/casecontrol.toml".to_string()
}

fn default_tick() -> u64 {
    30
}

fn default_console() -> bool {
    true
}

fn default_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud() -> u32 {
    casecontrol_hw::DEFAULT_BAUD_RATE
}

fn default_cycle() -> u64 {
    20
}

fn default_ack_timeout() -> u64 {
    1000
}

fn default_refresh() -> u64 {
    1500
}

fn default_reconnect() -> u64 {
    2500
}

fn default_boot_delay() -> u64 {
    2000
}

fn default_temps_log() -> String {
    "SpeedFan/SFLog%Y%m%d.csv".to_string()
}

fn default_sample_interval() -> u64 {
    1000
}

fn default_text_path() -> String {
    "notes.txt".to_string()
}

fn default_standings_url() -> String {
    "http://www.espn.com/nhl/standings".to_string()
}

fn default_division() -> String {
    "metropolitan".to_string()
}

fn default_standings_interval() -> u64 {
    600_000
}

fn default_standings_timeout() -> u64 {
    10_000
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            warn!(
                "Configuration file {:?} not found, using defaults",
                path.as_ref()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Returns the mode tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            tick: default_tick(),
            console: default_console(),
            serial: SerialConfig::default(),
            sensors: SensorsConfig::default(),
            text: TextConfig::default(),
            standings: StandingsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            tick = 40

            [serial]
            port = "/dev/ttyUSB1"
            "#,
        )
        .unwrap();
        assert_eq!(config.tick, 40);
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.serial.refresh, 1500);
        assert_eq!(config.standings.division, "metropolitan");
        assert_eq!(config.state_file, "state/casecontrol.toml");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped: Config = toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(shipped.tick, defaults.tick);
        assert_eq!(shipped.serial.port, defaults.serial.port);
        assert_eq!(shipped.serial.boot_delay, defaults.serial.boot_delay);
        assert_eq!(shipped.sensors.temps_log, defaults.sensors.temps_log);
        assert_eq!(shipped.standings.interval, defaults.standings.interval);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_or_default("/nonexistent/casecontrol.toml").unwrap();
        assert_eq!(config.tick, 30);
        assert_eq!(config.serial.ack_timeout, 1000);
    }
}
