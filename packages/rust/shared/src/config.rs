//! Application configuration for Firmscope.
//!
//! User config lives at `~/.firmscope/firmscope.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never written to the file, only the names of the env vars
//! that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FirmscopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "firmscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".firmscope";

// ---------------------------------------------------------------------------
// Config structs (matching firmscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// OpenAI-compatible completion provider settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Pipeline bounds and timeouts.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Structured extraction retry budget and token limits.
    #[serde(default)]
    pub extraction: ExtractionSettings,

    /// Headless browser rendering.
    #[serde(default)]
    pub render: RenderSettings,

    /// HTTP server.
    #[serde(default)]
    pub server: ServerSettings,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the Google API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the Custom Search engine id.
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// API base URL (overridable for proxies and tests).
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Hosts never accepted as a company's official website.
    #[serde(default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id_env: default_engine_id_env(),
            base_url: default_search_base_url(),
            timeout_secs: default_fetch_timeout(),
            excluded_domains: default_excluded_domains(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "GOOGLE_CSE_ID".into()
}
fn default_search_base_url() -> String {
    "https://www.googleapis.com".into()
}

/// Aggregator, social and finance directories that list companies but are
/// never the company's own site.
pub fn default_excluded_domains() -> Vec<String> {
    [
        "linkedin.com",
        "crunchbase.com",
        "bloomberg.com",
        "facebook.com",
        "twitter.com",
        "x.com",
        "instagram.com",
        "youtube.com",
        "wikipedia.org",
        "glassdoor.com",
        "indeed.com",
        "zoominfo.com",
        "pitchbook.com",
        "dnb.com",
        "yelp.com",
        "finance.yahoo.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// API base URL (OpenAI or any compatible gateway).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat model used for every completion.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            base_url: default_openai_base_url(),
            model: default_model(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Number of search results requested for the profile query.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Number of those results that are actually fetched.
    #[serde(default = "default_source_limit")]
    pub source_limit: usize,

    /// Maximum concurrent source fetches.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Per-fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Deadline for a whole profile run, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Paragraphs shorter than this are ignored when extracting source text.
    #[serde(default = "default_paragraph_min_chars")]
    pub paragraph_min_chars: usize,

    /// Maximum paragraphs kept per source.
    #[serde(default = "default_paragraph_limit")]
    pub paragraph_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            source_limit: default_source_limit(),
            fetch_concurrency: default_fetch_concurrency(),
            fetch_timeout_secs: default_fetch_timeout(),
            request_timeout_secs: default_request_timeout(),
            paragraph_min_chars: default_paragraph_min_chars(),
            paragraph_limit: default_paragraph_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}
fn default_source_limit() -> usize {
    8
}
fn default_fetch_concurrency() -> usize {
    4
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    300
}
fn default_paragraph_min_chars() -> usize {
    50
}
fn default_paragraph_limit() -> usize {
    5
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Attempts per structured extraction (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed sleep between attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-completion timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Character budget for text handed to the model in one prompt.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Token limit for the executive list extraction.
    #[serde(default = "default_leadership_max_tokens")]
    pub leadership_max_tokens: u32,

    /// Token limit for the full profile.
    #[serde(default = "default_profile_max_tokens")]
    pub profile_max_tokens: u32,

    /// Token limit for one sentiment label.
    #[serde(default = "default_sentiment_max_tokens")]
    pub sentiment_max_tokens: u32,

    /// Token limit for the similar-company list.
    #[serde(default = "default_similar_max_tokens")]
    pub similar_max_tokens: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_llm_timeout(),
            max_context_chars: default_max_context_chars(),
            leadership_max_tokens: default_leadership_max_tokens(),
            profile_max_tokens: default_profile_max_tokens(),
            sentiment_max_tokens: default_sentiment_max_tokens(),
            similar_max_tokens: default_similar_max_tokens(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    2_000
}
fn default_llm_timeout() -> u64 {
    30
}
fn default_max_context_chars() -> usize {
    24_000
}
fn default_leadership_max_tokens() -> u32 {
    500
}
fn default_profile_max_tokens() -> u32 {
    3_000
}
fn default_sentiment_max_tokens() -> u32 {
    50
}
fn default_similar_max_tokens() -> u32 {
    600
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Use the headless browser for source pages instead of a static fetch.
    #[serde(default)]
    pub enabled: bool,

    /// WebDriver endpoint (chromedriver or a Selenium grid).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Maximum concurrent browser sessions.
    #[serde(default = "default_render_workers")]
    pub workers: usize,

    /// Time allowed for client-side rendering after navigation, in ms.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            webdriver_url: default_webdriver_url(),
            workers: default_render_workers(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".into()
}
fn default_render_workers() -> usize {
    2
}
fn default_settle_ms() -> u64 {
    3_000
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".into()
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime page fetch configuration: merged from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum concurrent source fetches.
    pub concurrency: usize,
    /// Paragraph length threshold for source text.
    pub paragraph_min_chars: usize,
    /// Paragraphs kept per source.
    pub paragraph_limit: usize,
    /// Render sources through the headless browser.
    pub render: bool,
    /// WebDriver endpoint.
    pub webdriver_url: String,
    /// Render pool size.
    pub render_workers: usize,
    /// Post-navigation settle delay.
    pub render_settle: Duration,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.pipeline.fetch_timeout_secs),
            concurrency: config.pipeline.fetch_concurrency.max(1),
            paragraph_min_chars: config.pipeline.paragraph_min_chars,
            paragraph_limit: config.pipeline.paragraph_limit,
            render: config.render.enabled,
            webdriver_url: config.render.webdriver_url.clone(),
            render_workers: config.render.workers.max(1),
            render_settle: Duration::from_millis(config.render.settle_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API secrets resolved from the environment once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub google_api_key: String,
    pub google_cse_id: String,
    pub openai_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .field("google_cse_id", &self.google_cse_id)
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read every secret named in `config`. Fails on the first missing or empty one.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            google_api_key: require_env(&config.search.api_key_env, "Google Custom Search API key")?,
            google_cse_id: require_env(&config.search.engine_id_env, "Custom Search engine id")?,
            openai_api_key: require_env(&config.openai.api_key_env, "OpenAI API key")?,
        })
    }
}

fn require_env(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(FirmscopeError::config(format!(
            "{what} not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.firmscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FirmscopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.firmscope/firmscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FirmscopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FirmscopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FirmscopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FirmscopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FirmscopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
