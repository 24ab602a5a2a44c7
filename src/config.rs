use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::logging::LogConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    /// Persisted settings and calibration record.
    pub config_path: PathBuf,
    pub capture: CaptureConfig,
}

/// Timing and wiring for the capture loop.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub source_path: PathBuf,
    pub loop_replay: bool,
    pub frame_interval: Duration,
    pub source_retry: Duration,
    pub read_retry: Duration,
    pub event_channel_capacity: usize,
    pub command_channel_capacity: usize,
    /// Directory for the CSV tracking log.
    pub log_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("./observations.jsonl"),
            loop_replay: false,
            frame_interval: Duration::from_millis(33),
            source_retry: Duration::from_millis(1000),
            read_retry: Duration::from_millis(500),
            event_channel_capacity: 256,
            command_channel_capacity: 32,
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let log_dir = env_or("LOG_DIR", "./logs");
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3210_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            config_path: PathBuf::from(env_or("CONFIG_PATH", "./config.json")),
            capture: CaptureConfig {
                source_path: PathBuf::from(env_or("OBSERVATION_SOURCE", "./observations.jsonl")),
                loop_replay: env_or_bool("LOOP_REPLAY", false),
                frame_interval: Duration::from_millis(env_or_parse("FRAME_INTERVAL_MS", 33_u64)),
                source_retry: Duration::from_millis(env_or_parse("SOURCE_RETRY_MS", 1000_u64)),
                read_retry: Duration::from_millis(env_or_parse("READ_RETRY_MS", 500_u64)),
                event_channel_capacity: env_or_parse("EVENT_CHANNEL_CAPACITY", 256_usize).max(1),
                command_channel_capacity: 32,
                log_dir: PathBuf::from(&log_dir),
            },
            log_dir,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Failed to parse env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value = %raw, "Failed to parse boolean env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}
