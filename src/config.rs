use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Bloodwork";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default `EnvFilter` directive when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "bloodwork=info,bloodwork_lib=info,tower_http=info"
}

/// Get the application data directory.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bloodwork")
}

/// Tunables for the extraction pipeline.
///
/// Defaults mirror production behaviour; tests shrink `retry_delay` and the
/// thresholds to exercise specific branches.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Upper bound on text-based extraction attempts per request.
    pub max_attempts: usize,
    /// Analyte count at which an attempt is treated as complete.
    pub comprehensive_threshold: usize,
    /// Analyte count for the "moderate" quality label.
    pub moderate_threshold: usize,
    /// Pause between attempts (rate-limit backpressure).
    pub retry_delay: Duration,
    /// Maximum characters of document text sent to the model.
    pub max_text_chars: usize,
    /// Below this many characters the secondary text strategy runs.
    pub min_text_quality_chars: usize,
    /// Below this many characters (after both strategies) the document is unusable.
    pub min_text_floor_chars: usize,
    /// Secondary text extraction only reads this many leading pages.
    pub secondary_max_pages: usize,
    /// Vision fallback only renders this many leading pages.
    pub vision_max_pages: usize,
    /// Render resolution for vision fallback page images.
    pub vision_render_dpi: u32,
    pub temperature: f32,
    pub seed: u64,
    /// Wall-clock ceiling for a whole extraction request.
    pub request_timeout: Duration,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            comprehensive_threshold: 20,
            moderate_threshold: 10,
            retry_delay: Duration::from_millis(1000),
            max_text_chars: 50_000,
            min_text_quality_chars: 200,
            min_text_floor_chars: 20,
            secondary_max_pages: 5,
            vision_max_pages: 3,
            vision_render_dpi: 150,
            temperature: 0.1,
            seed: 12345,
            request_timeout: Duration::from_secs(60),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Model endpoint settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// Expose diagnostic details (truncated raw responses, causes) in error bodies.
    pub dev_mode: bool,
    pub model: ModelConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid bind address '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },
}

impl AppConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (testable without
    /// touching the process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("BLOODWORK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidBindAddr {
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let data_dir = lookup("BLOODWORK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);

        let dev_mode = lookup("BLOODWORK_DEV")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let model = lookup("OPENAI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = lookup("OPENAI_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            bind_addr,
            data_dir,
            dev_mode,
            model: ModelConfig {
                api_key,
                model,
                base_url,
            },
            extraction: ExtractionConfig::default(),
        })
    }

    /// SQLite database file for uploads and reports.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bloodwork.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_empty() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.base_url, "https://api.openai.com/v1");
        assert!(config.model.api_key.is_none());
        assert!(!config.dev_mode);
        assert!(config.data_dir.ends_with("bloodwork"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BLOODWORK_BIND", "0.0.0.0:8080"),
            ("BLOODWORK_DATA_DIR", "/tmp/bw"),
            ("BLOODWORK_DEV", "true"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bw"));
        assert!(config.dev_mode);
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/bw/bloodwork.db"));
    }

    #[test]
    fn blank_api_key_treated_as_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(config.model.api_key.is_none());
    }

    #[test]
    fn invalid_bind_address_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("BLOODWORK_BIND", "not-an-addr")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }

    #[test]
    fn extraction_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.comprehensive_threshold, 20);
        assert_eq!(config.moderate_threshold, 10);
        assert_eq!(config.max_text_chars, 50_000);
        assert_eq!(config.seed, 12345);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn app_name_is_bloodwork() {
        assert_eq!(APP_NAME, "Bloodwork");
    }
}
