use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::enrollment::EnrollmentConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the built dashboard (served with SPA fallback).
    #[serde(default = "default_dashboard_dir")]
    pub dashboard_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dashboard_dir: default_dashboard_dir(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_dashboard_dir() -> PathBuf {
    PathBuf::from("dashboard/dist")
}

/// Detection service connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Base URL of the detection service (e.g., "http://localhost:8000")
    #[serde(default = "default_detector_url")]
    pub url: String,
    /// Request timeout in seconds (default: 60, enrollment on CPU is slow)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: default_detector_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl DetectorConfig {
    /// URL of the MJPEG stream served by the detection service.
    pub fn stream_url(&self) -> String {
        format!("{}/api/stream", self.url.trim_end_matches('/'))
    }
}

fn default_detector_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout() -> u32 {
    60
}

/// Config view returned by the dashboard API.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub detector: SanitizedDetectorConfig,
    pub enrollment: EnrollmentConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDetectorConfig {
    pub url: String,
    pub stream_url: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            detector: SanitizedDetectorConfig {
                url: config.detector.url.clone(),
                stream_url: config.detector.stream_url(),
                timeout_secs: config.detector.timeout_secs,
            },
            enrollment: config.enrollment.clone(),
        }
    }
}
