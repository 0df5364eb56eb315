use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::poller::RetryPolicy;
use crate::request::RequestParameters;
use crate::{Result, VideoError};

/// Configuration for the Sora video client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Remote service connection settings
    pub api: ApiConfig,

    /// Generation request parameters
    pub request: RequestConfig,

    /// Status polling settings
    pub polling: PollingConfig,

    /// Output artifact settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API; `/videos` is appended
    pub base_url: String,

    /// Credential sent verbatim in the Authorization header
    pub api_key: String,

    /// Connection timeout (seconds)
    pub connect_timeout_seconds: u64,

    /// Timeout for submit and status calls (seconds). Downloads are not bounded.
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub prompt: String,
    pub model: String,

    /// Output resolution, e.g. `1280x720` or `720x1280`
    pub size: String,

    /// Clip duration in seconds
    pub seconds: u32,

    /// Reference image; when set and present the job is image-conditioned
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub max_wait_seconds: u64,

    /// Give up after this many consecutive failed status queries.
    /// Unset means only `max_wait_seconds` bounds the retries.
    pub max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the artifact is written to
    pub dir: PathBuf,

    /// Leading part of the artifact file name
    pub file_prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.apiyi.com/v1".to_string(),
            api_key: String::new(),
            connect_timeout_seconds: 30,
            request_timeout_seconds: 120,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: "sora-2".to_string(),
            size: "1280x720".to_string(),
            seconds: 15,
            image_path: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            max_wait_seconds: 600, // generation usually takes 3-5 minutes
            max_consecutive_failures: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            file_prefix: "sora".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl PollingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.interval_seconds),
            Duration::from_secs(self.max_wait_seconds),
        )
        .with_max_consecutive_failures(self.max_consecutive_failures)
    }
}

impl RequestConfig {
    pub fn parameters(&self) -> RequestParameters {
        RequestParameters {
            prompt: self.prompt.clone(),
            model: self.model.clone(),
            size: self.size.clone(),
            seconds: self.seconds,
            image_path: self.image_path.clone(),
        }
    }
}

const CONFIG_SEARCH_PATHS: [&str; 2] = ["sora-video.toml", "config/sora-video.toml"];

impl Config {
    /// Load configuration from an explicit file, the default search paths, or
    /// built-in defaults, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::from_search_paths()?,
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            VideoError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = toml::from_str(&config_str).map_err(|e| {
            VideoError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn from_search_paths() -> Result<Self> {
        let paths: Vec<PathBuf> = CONFIG_SEARCH_PATHS.into_iter().map(PathBuf::from).collect();
        Ok(Self::first_existing(&paths)?.unwrap_or_default())
    }

    /// Parse the first path that exists. A file that exists but does not
    /// parse is an error, not a reason to fall back to defaults.
    fn first_existing(paths: &[PathBuf]) -> Result<Option<Self>> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => Self::from_file(path).map(Some),
            None => Ok(None),
        }
    }

    /// Override settings from `SORA_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("SORA_API_KEY") {
            self.api.api_key = api_key;
        }

        if let Some(base_url) = lookup("SORA_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Some(prompt) = lookup("SORA_PROMPT") {
            self.request.prompt = prompt;
        }

        if let Some(model) = lookup("SORA_MODEL") {
            self.request.model = model;
        }

        if let Some(size) = lookup("SORA_SIZE") {
            self.request.size = size;
        }

        if let Some(seconds) = lookup("SORA_SECONDS") {
            match seconds.parse() {
                Ok(value) => self.request.seconds = value,
                Err(_) => warn!("Ignoring invalid SORA_SECONDS: {}", seconds),
            }
        }

        if let Some(image_path) = lookup("SORA_IMAGE_PATH") {
            self.request.image_path = if image_path.is_empty() {
                None
            } else {
                Some(PathBuf::from(image_path))
            };
        }

        if let Some(interval) = lookup("SORA_POLL_INTERVAL") {
            match interval.parse() {
                Ok(value) => self.polling.interval_seconds = value,
                Err(_) => warn!("Ignoring invalid SORA_POLL_INTERVAL: {}", interval),
            }
        }

        if let Some(max_wait) = lookup("SORA_MAX_WAIT") {
            match max_wait.parse() {
                Ok(value) => self.polling.max_wait_seconds = value,
                Err(_) => warn!("Ignoring invalid SORA_MAX_WAIT: {}", max_wait),
            }
        }

        if let Some(output_dir) = lookup("SORA_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(output_dir);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| VideoError::Config(format!("cannot serialize config: {}", e)))?;
        std::fs::write(path, config_str)?;
        info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.trim().is_empty() {
            return Err(VideoError::Config(
                "api_key is required (set SORA_API_KEY or [api].api_key)".to_string(),
            ));
        }

        let base_url = url::Url::parse(&self.api.base_url)
            .map_err(|e| VideoError::Config(format!("invalid base_url {}: {}", self.api.base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(VideoError::Config(format!(
                "base_url must be http or https, got {}",
                base_url.scheme()
            )));
        }

        if self.request.prompt.trim().is_empty() {
            return Err(VideoError::Config("prompt must not be empty".to_string()));
        }

        if !is_valid_size(&self.request.size) {
            return Err(VideoError::Config(format!(
                "size must look like WIDTHxHEIGHT, got {}",
                self.request.size
            )));
        }

        if self.request.seconds == 0 {
            return Err(VideoError::Config("seconds must be greater than 0".to_string()));
        }

        if self.polling.interval_seconds == 0 {
            return Err(VideoError::Config(
                "interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.polling.max_wait_seconds < self.polling.interval_seconds {
            return Err(VideoError::Config(
                "max_wait_seconds must be at least interval_seconds".to_string(),
            ));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Sora Video Configuration:\n\
            - Endpoint: {}/videos\n\
            - Model: {}\n\
            - Size: {}\n\
            - Duration: {}s\n\
            - Reference Image: {}\n\
            - Poll Interval: {}s (max wait {}s)\n\
            - Output Directory: {}",
            self.api.base_url.trim_end_matches('/'),
            self.request.model,
            self.request.size,
            self.request.seconds,
            self.request
                .image_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.polling.interval_seconds,
            self.polling.max_wait_seconds,
            self.output.dir.display(),
        )
    }
}

fn is_valid_size(size: &str) -> bool {
    match size.split_once('x') {
        Some((width, height)) => {
            matches!(width.parse::<u32>(), Ok(w) if w > 0)
                && matches!(height.parse::<u32>(), Ok(h) if h > 0)
        }
        None => false,
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api.api_key = api_key.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.request.prompt = prompt.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.request.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.config.request.size = size.into();
        self
    }

    pub fn with_seconds(mut self, seconds: u32) -> Self {
        self.config.request.seconds = seconds;
        self
    }

    pub fn with_image_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.request.image_path = path;
        self
    }

    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.config.polling.interval_seconds = seconds;
        self
    }

    pub fn with_max_wait(mut self, seconds: u64) -> Self {
        self.config.polling.max_wait_seconds = seconds;
        self
    }

    pub fn with_max_consecutive_failures(mut self, limit: Option<u32>) -> Self {
        self.config.polling.max_consecutive_failures = limit;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.dir = dir;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
