//! Configuration management for the live proxy.
//!
//! The proxy reads an optional configuration file at `~/.live-proxy/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! ## API access
//! - `VERTEX_API` → api.use_vertex
//! - `GOOGLE_API_KEY` / `GEMINI_API_KEY` → api.api_key
//! - `PROJECT_ID` → api.project_id
//! - `VERTEX_LOCATION` → api.location
//! - `VERTEX_ACCESS_TOKEN` → api.access_token
//!
//! ## Live model
//! - `MODEL_VERTEX_API` / `MODEL_DEV_API` → live.model (picked by api mode)
//! - `VOICE_VERTEX_API` / `VOICE_DEV_API` → live.voice (picked by api mode)
//! - `SYSTEM_INSTRUCTIONS_PATH` → live.system_instructions_path
//!
//! ## Incremental summary
//! - `INCREMENTAL_UPDATES_ENABLED` → summary.enabled
//! - `INCREMENTAL_SUMMARY_INTERVAL_SEC` → summary.interval_secs
//! - `INCREMENTAL_SUMMARY_MIN_CHARS` → summary.min_chars
//! - `INCREMENTAL_SUMMARY_ENFORCE_MIN_CHARS` → summary.enforce_min_chars
//! - `INCREMENTAL_SUMMARY_MAX_TOKENS` → summary.max_output_tokens
//! - `INCREMENTAL_SUMMARY_MODEL` → summary.model
//! - `INCREMENTAL_SUMMARY_PROMPT` → summary.prompt
//! - `THOUGHTFUL_QUESTIONS_PROMPT` → summary.questions_prompt
//!
//! ## Observability
//! - `LIVE_LOG_LEVEL` → observability.log_level

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".live-proxy"),
        |dirs| dirs.home_dir().join(".live-proxy"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// API Access
// ============================================================================

/// Credentials and endpoint selection for the hosted generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Use Vertex AI instead of the developer API.
    #[serde(default)]
    pub use_vertex: bool,

    /// Developer API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Cloud project id (Vertex only).
    #[serde(default)]
    pub project_id: Option<String>,

    /// Vertex region.
    #[serde(default = "default_location")]
    pub location: String,

    /// OAuth access token for Vertex. Minting it is left to the deployment.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Timeout for one non-streaming generation request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            use_vertex: false,
            api_key: None,
            project_id: None,
            location: default_location(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_location() -> String {
    "us-central1".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Resolved credentials for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuth {
    /// Developer API authenticated with a key.
    ApiKey(String),
    /// Vertex AI authenticated with a bearer token.
    Vertex {
        project_id: String,
        location: String,
        access_token: String,
    },
}

impl ApiConfig {
    /// Resolve the credentials required for the configured mode.
    ///
    /// Fails with a configuration error when anything required is missing.
    pub fn resolve_auth(&self) -> crate::Result<ApiAuth> {
        if self.use_vertex {
            let project_id = non_empty(&self.project_id)
                .ok_or_else(|| crate::Error::Config("PROJECT_ID is required for Vertex AI".into()))?;
            let access_token = non_empty(&self.access_token).ok_or_else(|| {
                crate::Error::Config("VERTEX_ACCESS_TOKEN is required for Vertex AI".into())
            })?;
            Ok(ApiAuth::Vertex {
                project_id,
                location: self.location.clone(),
                access_token,
            })
        } else {
            non_empty(&self.api_key).map(ApiAuth::ApiKey).ok_or_else(|| {
                crate::Error::Config("No API key available from configuration or environment".into())
            })
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// ============================================================================
// Live Model
// ============================================================================

/// Settings for the live (duplex) model session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveModelConfig {
    /// Model override. When unset the default for the API mode is used.
    #[serde(default)]
    pub model: Option<String>,

    /// Prebuilt voice override. When unset the default for the API mode is used.
    #[serde(default)]
    pub voice: Option<String>,

    /// File holding the system instructions for the live model.
    #[serde(default = "default_system_instructions_path")]
    pub system_instructions_path: PathBuf,
}

impl Default for LiveModelConfig {
    fn default() -> Self {
        Self {
            model: None,
            voice: None,
            system_instructions_path: default_system_instructions_path(),
        }
    }
}

fn default_system_instructions_path() -> PathBuf {
    PathBuf::from("config/system-instructions.txt")
}

impl LiveModelConfig {
    /// Model name for the given API mode.
    pub fn model(&self, use_vertex: bool) -> String {
        self.model.clone().unwrap_or_else(|| {
            if use_vertex {
                "gemini-live-2.5-flash-preview-native-audio".into()
            } else {
                "models/gemini-live-2.5-flash-preview-native-audio".into()
            }
        })
    }

    /// Voice name for the given API mode.
    pub fn voice(&self, use_vertex: bool) -> String {
        self.voice.clone().unwrap_or_else(|| {
            if use_vertex {
                "Aoede".into()
            } else {
                "Puck".into()
            }
        })
    }

    /// Read the system instructions file.
    pub fn read_system_instructions(&self) -> crate::Result<String> {
        let path = &self.system_instructions_path;
        crate::error::ResultExt::context(
            fs::read_to_string(path),
            format!("reading system instructions from {}", path.display()),
        )
    }

    /// Like [`read_system_instructions`](Self::read_system_instructions), but
    /// a missing or unreadable file yields an empty string so the session can
    /// still start.
    pub fn load_system_instructions(&self) -> String {
        self.read_system_instructions().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load system instructions");
            String::new()
        })
    }
}

// ============================================================================
// Incremental Summary
// ============================================================================

/// Background summarization of long conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Run compaction cycles at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum seconds between two compaction cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Minimum buffered characters before a cycle is worth running.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Gate cycles on `min_chars`. Off by default: the threshold is advisory.
    #[serde(default)]
    pub enforce_min_chars: bool,

    /// Output cap for the compaction model.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Text model used for compaction.
    #[serde(default = "default_summary_model")]
    pub model: String,

    /// Compaction instruction.
    #[serde(default = "default_summary_prompt")]
    pub prompt: String,

    /// Instruction used when the conversation moves to the question phase.
    #[serde(default = "default_questions_prompt")]
    pub questions_prompt: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            min_chars: default_min_chars(),
            enforce_min_chars: false,
            max_output_tokens: default_max_output_tokens(),
            model: default_summary_model(),
            prompt: default_summary_prompt(),
            questions_prompt: default_questions_prompt(),
        }
    }
}

impl SummaryConfig {
    /// Interval between compaction cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_min_chars() -> usize {
    500
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_summary_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_summary_prompt() -> String {
    "You are maintaining a running, compact summary of a presentation so far.\n\
     - Summarize only what has been presented (no hallucinations).\n\
     - Preserve key claims, evidence, examples, and references to visuals if mentioned.\n\
     - Prefer bullet points. Keep under ~1000 words.\n\
     Return only the summary text (no preamble)."
        .into()
}

fn default_questions_prompt() -> String {
    "Using the summary of the presentation, ask 3-5 thoughtful, specific questions that \
     test understanding, evidence, and implications. Keep them concise."
        .into()
}

// ============================================================================
// Tools
// ============================================================================

/// Tool name to HTTP endpoint mapping.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    /// Cloud function endpoints keyed by tool name.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub live: LiveModelConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("VERTEX_API") {
            self.api.use_vertex = parse_flag(&v);
        }
        if let Some(key) = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY")) {
            self.api.api_key = Some(key);
        }
        if let Some(project) = var("PROJECT_ID") {
            self.api.project_id = Some(project);
        }
        if let Some(location) = var("VERTEX_LOCATION") {
            self.api.location = location;
        }
        if let Some(token) = var("VERTEX_ACCESS_TOKEN") {
            self.api.access_token = Some(token);
        }

        // Model and voice variables are mode specific
        let (model_var, voice_var) = if self.api.use_vertex {
            ("MODEL_VERTEX_API", "VOICE_VERTEX_API")
        } else {
            ("MODEL_DEV_API", "VOICE_DEV_API")
        };
        if let Some(model) = var(model_var) {
            self.live.model = Some(model);
        }
        if let Some(voice) = var(voice_var) {
            self.live.voice = Some(voice);
        }
        if let Some(path) = var("SYSTEM_INSTRUCTIONS_PATH") {
            self.live.system_instructions_path = PathBuf::from(path);
        }

        self.apply_summary_overrides(&var);

        if let Some(level) = var("LIVE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }

    fn apply_summary_overrides<F>(&mut self, var: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("INCREMENTAL_UPDATES_ENABLED") {
            self.summary.enabled = parse_flag(&v);
        }
        if let Some(v) = var("INCREMENTAL_SUMMARY_INTERVAL_SEC") {
            match v.trim().parse() {
                Ok(secs) => self.summary.interval_secs = secs,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid INCREMENTAL_SUMMARY_INTERVAL_SEC"),
            }
        }
        if let Some(v) = var("INCREMENTAL_SUMMARY_MIN_CHARS") {
            match v.trim().parse() {
                Ok(chars) => self.summary.min_chars = chars,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid INCREMENTAL_SUMMARY_MIN_CHARS"),
            }
        }
        if let Some(v) = var("INCREMENTAL_SUMMARY_ENFORCE_MIN_CHARS") {
            self.summary.enforce_min_chars = parse_flag(&v);
        }
        if let Some(v) = var("INCREMENTAL_SUMMARY_MAX_TOKENS") {
            match v.trim().parse() {
                Ok(tokens) => self.summary.max_output_tokens = tokens,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid INCREMENTAL_SUMMARY_MAX_TOKENS"),
            }
        }
        if let Some(model) = var("INCREMENTAL_SUMMARY_MODEL") {
            self.summary.model = model;
        }
        if let Some(prompt) = var("INCREMENTAL_SUMMARY_PROMPT") {
            self.summary.prompt = prompt.trim().to_string();
        }
        if let Some(prompt) = var("THOUGHTFUL_QUESTIONS_PROMPT") {
            self.summary.questions_prompt = prompt.trim().to_string();
        }
    }
}

/// Boolean environment flags are true only for a case-insensitive "true".
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
