//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use entrada_core::CountSemantics;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 10)
    pub body_limit_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Path of the visit ledger document (default: visits.json)
    pub ledger_path: PathBuf,
    /// Directory for staged captures pending promotion (default: temp-images)
    pub staging_dir: PathBuf,
    /// Recognition service base URL; mock recognition is used when unset
    pub recognition_api_url: Option<String>,
    /// Recognition service bearer token
    pub recognition_api_key: Option<String>,
    /// Face collection searched and enrolled into
    pub recognition_collection: String,
    /// Capture daemon base URL; the camera reports unavailable when unset
    pub capture_api_url: Option<String>,
    /// Recognition match threshold in percent (default: 85)
    pub match_threshold: u8,
    /// Repeat-visit lookback window in hours (default: 24)
    pub recent_window_hours: i64,
    /// Count convention for the atomic check-and-register flow
    /// (default: after-register)
    pub count_semantics: CountSemantics,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 10,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            ledger_path: PathBuf::from("visits.json"),
            staging_dir: PathBuf::from("temp-images"),
            recognition_api_url: None,
            recognition_api_key: None,
            recognition_collection: "entrada-faces".to_string(),
            capture_api_url: None,
            match_threshold: entrada_core::DEFAULT_MATCH_THRESHOLD,
            recent_window_hours: 24,
            count_semantics: CountSemantics::AfterRegister,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.body_limit_mb);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_sec);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_burst);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let ledger_path = std::env::var("LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.ledger_path);

        let staging_dir = std::env::var("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.staging_dir);

        let recognition_api_url = std::env::var("RECOGNITION_API_URL").ok();
        let recognition_api_key = std::env::var("RECOGNITION_API_KEY").ok();
        let recognition_collection = std::env::var("RECOGNITION_COLLECTION")
            .unwrap_or(defaults.recognition_collection);

        let capture_api_url = std::env::var("CAPTURE_API_URL").ok();

        let match_threshold = std::env::var("MATCH_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.match_threshold);

        let recent_window_hours = std::env::var("RECENT_WINDOW_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.recent_window_hours);

        let count_semantics = match std::env::var("COUNT_SEMANTICS").as_deref() {
            Ok("before-register") => CountSemantics::BeforeRegister,
            _ => CountSemantics::AfterRegister,
        };

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            ledger_path,
            staging_dir,
            recognition_api_url,
            recognition_api_key,
            recognition_collection,
            capture_api_url,
            match_threshold,
            recent_window_hours,
            count_semantics,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.match_threshold, 85);
        assert_eq!(config.recent_window_hours, 24);
        assert_eq!(config.count_semantics, CountSemantics::AfterRegister);
        assert!(!config.rate_limit_enabled);
        assert!(config.recognition_api_url.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }
}
