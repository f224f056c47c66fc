//! Configuration resolution for Sanskara.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/sanskara/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Sanskara configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP/WebSocket listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub log_level: String,
    pub max_frame_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".to_string(),
            log_level: "info".to_string(),
            max_frame_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

/// Realtime generative backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub app_name: String,
    pub model: String,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub voice_name: String,
    pub send_sample_rate: u32,
    pub response_modalities: Vec<String>,
    /// Optional system-instruction template; the built-in one is used when unset.
    pub instruction_path: Option<PathBuf>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            app_name: "multimodal_assistant".to_string(),
            model: "gemini-2.0-flash-live-001".to_string(),
            endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            api_key: None,
            voice_name: "Puck".to_string(),
            send_sample_rate: 16_000,
            response_modalities: vec!["TEXT".to_string()],
            instruction_path: None,
        }
    }
}

/// Upstream stream recovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 750,
            max_delay_ms: 30_000,
        }
    }
}

/// Which `Store` implementation backs session priming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Http,
}

/// Relational store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_path: Option<PathBuf>,
    /// Remote SQL execution endpoint (for the `http` backend).
    pub sql_endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub sql_api_key: Option<String>,
    pub project_id: Option<String>,
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory of stored artifacts (default: `~/.sanskara/artifacts`).
    pub directory: Option<PathBuf>,
}

/// Per-session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub default_video_mode: String,
    pub default_user_id: String,
    /// Maximum list length kept per primed context key.
    pub list_caps: HashMap<String, usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let list_caps = [
            ("active_workflows", 10),
            ("relevant_tasks", 25),
            ("all_tasks", 25),
            ("shortlisted_vendors", 10),
            ("recent_expenses", 10),
            ("upcoming_events", 10),
            ("overdue_tasks", 10),
            ("urgent_tasks", 10),
            ("upcoming_deadlines", 5),
            ("calendar_events", 20),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            default_video_mode: crate::protocol::DEFAULT_VIDEO_MODE.to_string(),
            default_user_id: "default_user_id".to_string(),
            list_caps,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    // Load global config
    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        config = load_config_file(&global_path)?;
    }

    // An explicitly requested file must exist
    if let Some(path) = explicit {
        let overlay = load_config_file(path)?;
        merge_config(&mut config, overlay);
    }

    // Apply environment overrides
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".sanskara").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/sanskara/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("sanskara").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, mut overlay: Config) {
    base.gateway = overlay.gateway;
    base.reconnect = overlay.reconnect;
    base.session = overlay.session;

    // Secrets survive an overlay that does not repeat them
    let api_key = overlay.live.api_key.take().or_else(|| base.live.api_key.take());
    base.live = overlay.live;
    base.live.api_key = api_key;

    let sql_api_key = overlay
        .store
        .sql_api_key
        .take()
        .or_else(|| base.store.sql_api_key.take());
    base.store = overlay.store;
    base.store.sql_api_key = sql_api_key;

    if overlay.artifacts.directory.is_some() {
        base.artifacts.directory = overlay.artifacts.directory;
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("SANSKARA_BIND_ADDR") {
        config.gateway.bind_addr = val;
    }
    if let Some(val) = var("SANSKARA_LOG_LEVEL") {
        config.gateway.log_level = val;
    }
    if let Some(val) = var("SANSKARA_MODEL") {
        config.live.model = val;
    }
    if let Some(val) = var("SANSKARA_VOICE_NAME") {
        config.live.voice_name = val;
    }
    if let Some(val) = var("SANSKARA_LIVE_ENDPOINT") {
        config.live.endpoint = val;
    }
    if let Some(val) = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY")) {
        config.live.api_key = Some(val);
    }
    if let Some(n) = var("SANSKARA_MAX_RECONNECT_ATTEMPTS").and_then(|v| v.parse().ok()) {
        config.reconnect.max_attempts = n;
    }
    if let Some(n) = var("SANSKARA_RECONNECT_BASE_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.reconnect.base_delay_ms = n;
    }
    if let Some(val) = var("SANSKARA_STORE_BACKEND") {
        match val.as_str() {
            "sqlite" => config.store.backend = StoreBackend::Sqlite,
            "http" => config.store.backend = StoreBackend::Http,
            _ => {}
        }
    }
    if let Some(val) = var("SANSKARA_DB_PATH") {
        config.store.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("SANSKARA_SQL_ENDPOINT") {
        config.store.sql_endpoint = Some(val);
    }
    if let Some(val) = var("SANSKARA_SQL_API_KEY") {
        config.store.sql_api_key = Some(val);
    }
    if let Some(val) = var("SANSKARA_ARTIFACT_DIR") {
        config.artifacts.directory = Some(PathBuf::from(val));
    }
}
