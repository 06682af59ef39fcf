//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or `VOXDESK_CONFIG`) relative to the current
//! working directory, then applies `VOXDESK_WORK_DIR` and `VOXDESK_LOG_LEVEL`
//! overrides. Vendor credentials are never read from TOML; they come from the
//! process environment through [`Secrets::from_env`].

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
}

/// Console channel configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Whether the console channel may run. It still needs `-i` at startup.
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub http: HttpConfig,
    pub console: ConsoleConfig,
}

/// Search backends that can appear in `[search] providers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    Google,
    Serper,
    Dummy,
}

#[derive(Debug, Clone)]
pub struct GoogleSearchConfig {
    pub endpoint: String,
    /// `dateRestrict` value used for news queries (e.g. `d1`).
    pub news_date_restrict: String,
}

#[derive(Debug, Clone)]
pub struct SerperConfig {
    pub search_endpoint: String,
    pub news_endpoint: String,
    /// `tbs` value sent with web queries (e.g. `qdr:d`).
    pub time_filter: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Tier order; the first entry is the primary provider.
    pub providers: Vec<SearchBackend>,
    pub num_results: u8,
    pub google: GoogleSearchConfig,
    pub serper: SerperConfig,
}

/// Generation backends that can appear in `[[llm.tiers]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAiCompatible,
    Dummy,
}

/// One generation tier, resolved from `[[llm.tiers]]`.
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub backend: LlmBackend,
    pub model: String,
    pub api_base_url: String,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Tier order; the first entry is the primary model.
    pub tiers: Vec<TierConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackend {
    Freepik,
    Dummy,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub backend: ImageBackend,
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialBackend {
    X,
    Dummy,
}

#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub backend: SocialBackend,
    pub api_base_url: String,
    pub permalink_base: String,
    /// Posts issued from a voice command are cut to this many characters.
    pub max_post_chars: usize,
}

#[derive(Debug, Clone)]
pub struct PreferencesConfig {
    /// SQLite file name, relative to `work_dir`.
    pub db_file: String,
}

/// Vendor credentials. Sourced only from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub serper_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Bearer key for OpenAI-compatible tiers; `None` for keyless local servers.
    pub llm_api_key: Option<String>,
    pub freepik_api_key: Option<String>,
    /// OAuth 2.0 user-context token for the X API.
    pub x_access_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            google_search_api_key: env_secret("GOOGLE_SEARCH_API_KEY"),
            google_search_engine_id: env_secret("GOOGLE_SEARCH_ENGINE_ID"),
            serper_api_key: env_secret("SERPER_API_KEY"),
            gemini_api_key: env_secret("GOOGLE_GEMINI_API_KEY"),
            llm_api_key: env_secret("LLM_API_KEY"),
            freepik_api_key: env_secret("FREEPIK_API_KEY"),
            x_access_token: env_secret("X_ACCESS_TOKEN"),
        }
    }
}

/// Blank values count as absent.
fn env_secret(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Directory holding the briefing prompt templates.
    pub prompts_dir: PathBuf,
    /// Whole-request timeout for outbound calls. `None` keeps the transport default.
    pub http_timeout_seconds: Option<u64>,
    pub comms: CommsConfig,
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub image: ImageConfig,
    pub social: SocialConfig,
    pub preferences: PreferencesConfig,
    pub secrets: Secrets,
}

impl Config {
    pub fn preferences_db_path(&self) -> PathBuf {
        self.work_dir.join(&self.preferences.db_file)
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    assistant: RawAssistant,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    image: RawImage,
    #[serde(default)]
    social: RawSocial,
    #[serde(default)]
    preferences: RawPreferences,
}

#[derive(Deserialize)]
struct RawAssistant {
    name: String,
    work_dir: String,
    log_level: String,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
    #[serde(default)]
    http_timeout_seconds: u64,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    console: RawConsole,
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: true, bind: default_http_bind() }
    }
}

#[derive(Deserialize)]
struct RawConsole {
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawConsole {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default = "default_search_providers")]
    providers: Vec<String>,
    #[serde(default = "default_num_results")]
    num_results: u8,
    #[serde(default)]
    google: RawGoogle,
    #[serde(default)]
    serper: RawSerper,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            providers: default_search_providers(),
            num_results: default_num_results(),
            google: RawGoogle::default(),
            serper: RawSerper::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawGoogle {
    #[serde(default = "default_google_endpoint")]
    endpoint: String,
    #[serde(default = "default_news_date_restrict")]
    news_date_restrict: String,
}

impl Default for RawGoogle {
    fn default() -> Self {
        Self { endpoint: default_google_endpoint(), news_date_restrict: default_news_date_restrict() }
    }
}

#[derive(Deserialize)]
struct RawSerper {
    #[serde(default = "default_serper_search_endpoint")]
    search_endpoint: String,
    #[serde(default = "default_serper_news_endpoint")]
    news_endpoint: String,
    #[serde(default = "default_serper_time_filter")]
    time_filter: String,
}

impl Default for RawSerper {
    fn default() -> Self {
        Self {
            search_endpoint: default_serper_search_endpoint(),
            news_endpoint: default_serper_news_endpoint(),
            time_filter: default_serper_time_filter(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(default = "default_tiers")]
    tiers: Vec<RawTier>,
    #[serde(default)]
    gemini: RawEndpoint,
    #[serde(default)]
    openai: RawEndpoint,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { tiers: default_tiers(), gemini: RawEndpoint::default(), openai: RawEndpoint::default() }
    }
}

#[derive(Deserialize)]
struct RawTier {
    provider: String,
    model: String,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
}

#[derive(Deserialize, Default)]
struct RawEndpoint {
    #[serde(default)]
    api_base_url: Option<String>,
}

#[derive(Deserialize)]
struct RawImage {
    #[serde(default = "default_image_provider")]
    provider: String,
    #[serde(default = "default_freepik_endpoint")]
    endpoint: String,
}

impl Default for RawImage {
    fn default() -> Self {
        Self { provider: default_image_provider(), endpoint: default_freepik_endpoint() }
    }
}

#[derive(Deserialize)]
struct RawSocial {
    #[serde(default = "default_social_provider")]
    provider: String,
    #[serde(default = "default_x_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_permalink_base")]
    permalink_base: String,
    #[serde(default = "default_max_post_chars")]
    max_post_chars: usize,
}

impl Default for RawSocial {
    fn default() -> Self {
        Self {
            provider: default_social_provider(),
            api_base_url: default_x_api_base_url(),
            permalink_base: default_permalink_base(),
            max_post_chars: default_max_post_chars(),
        }
    }
}

#[derive(Deserialize)]
struct RawPreferences {
    #[serde(default = "default_db_file")]
    db_file: String,
}

impl Default for RawPreferences {
    fn default() -> Self {
        Self { db_file: default_db_file() }
    }
}

fn default_true() -> bool { true }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_search_providers() -> Vec<String> { vec!["google".to_string(), "serper".to_string()] }
fn default_num_results() -> u8 { 10 }
fn default_google_endpoint() -> String { "https://www.googleapis.com/customsearch/v1".to_string() }
fn default_news_date_restrict() -> String { "d1".to_string() }
fn default_serper_search_endpoint() -> String { "https://google.serper.dev/search".to_string() }
fn default_serper_news_endpoint() -> String { "https://google.serper.dev/news".to_string() }
fn default_serper_time_filter() -> String { "qdr:d".to_string() }
fn default_gemini_api_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_tiers() -> Vec<RawTier> {
    ["gemini-2.0-flash-exp", "gemini-1.5-flash"]
        .into_iter()
        .map(|model| RawTier {
            provider: "gemini".to_string(),
            model: model.to_string(),
            api_base_url: None,
            temperature: None,
        })
        .collect()
}
fn default_image_provider() -> String { "freepik".to_string() }
fn default_freepik_endpoint() -> String { "https://api.freepik.com/v1/ai/text-to-image".to_string() }
fn default_social_provider() -> String { "x".to_string() }
fn default_x_api_base_url() -> String { "https://api.x.com/2".to_string() }
fn default_permalink_base() -> String { "https://x.com/i/web/status".to_string() }
fn default_max_post_chars() -> usize { 280 }
fn default_db_file() -> String { "preferences.db".to_string() }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `path` (or `VOXDESK_CONFIG`, or the default path), then
/// apply env-var overrides and read credentials from the environment.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let path_override = env::var("VOXDESK_CONFIG").ok();
    let path = path
        .or(path_override.as_deref())
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let work_dir_override = env::var("VOXDESK_WORK_DIR").ok();
    let log_level_override = env::var("VOXDESK_LOG_LEVEL").ok();
    load_from(
        Path::new(path),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
        Secrets::from_env(),
    )
}

/// Internal loader. Accepts an explicit path, overrides and secrets.
/// Tests pass these directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
    secrets: Secrets,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let a = parsed.assistant;
    let work_dir = expand_home(work_dir_override.unwrap_or(&a.work_dir));
    let log_level = log_level_override.unwrap_or(&a.log_level).to_string();

    let providers = parsed
        .search
        .providers
        .iter()
        .map(|p| parse_search_backend(p))
        .collect::<Result<Vec<_>, _>>()?;

    if parsed.search.num_results == 0 || parsed.search.num_results > 10 {
        return Err(AppError::Config(format!(
            "search.num_results must be between 1 and 10, got {}",
            parsed.search.num_results
        )));
    }

    let gemini_base = parsed.llm.gemini.api_base_url.unwrap_or_else(default_gemini_api_base_url);
    let openai_base = parsed.llm.openai.api_base_url.unwrap_or_else(default_openai_api_base_url);
    let tiers = parsed
        .llm
        .tiers
        .into_iter()
        .map(|t| {
            let backend = parse_llm_backend(&t.provider)?;
            let api_base_url = t.api_base_url.unwrap_or_else(|| match backend {
                LlmBackend::Gemini => gemini_base.clone(),
                LlmBackend::OpenAiCompatible => openai_base.clone(),
                LlmBackend::Dummy => String::new(),
            });
            Ok(TierConfig { backend, model: t.model, api_base_url, temperature: t.temperature })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let image_backend = match parsed.image.provider.as_str() {
        "freepik" => ImageBackend::Freepik,
        "dummy" => ImageBackend::Dummy,
        other => return Err(AppError::Config(format!("unknown image provider: {other}"))),
    };

    let social_backend = match parsed.social.provider.as_str() {
        "x" | "twitter" => SocialBackend::X,
        "dummy" => SocialBackend::Dummy,
        other => return Err(AppError::Config(format!("unknown social provider: {other}"))),
    };

    Ok(Config {
        name: a.name,
        prompts_dir: PathBuf::from(a.prompts_dir),
        http_timeout_seconds: (a.http_timeout_seconds > 0).then_some(a.http_timeout_seconds),
        work_dir,
        log_level,
        comms: CommsConfig {
            http: HttpConfig { enabled: parsed.comms.http.enabled, bind: parsed.comms.http.bind },
            console: ConsoleConfig { enabled: parsed.comms.console.enabled },
        },
        search: SearchConfig {
            providers,
            num_results: parsed.search.num_results,
            google: GoogleSearchConfig {
                endpoint: parsed.search.google.endpoint,
                news_date_restrict: parsed.search.google.news_date_restrict,
            },
            serper: SerperConfig {
                search_endpoint: parsed.search.serper.search_endpoint,
                news_endpoint: parsed.search.serper.news_endpoint,
                time_filter: parsed.search.serper.time_filter,
            },
        },
        llm: LlmConfig { tiers },
        image: ImageConfig { backend: image_backend, endpoint: parsed.image.endpoint },
        social: SocialConfig {
            backend: social_backend,
            api_base_url: parsed.social.api_base_url,
            permalink_base: parsed.social.permalink_base,
            max_post_chars: parsed.social.max_post_chars,
        },
        preferences: PreferencesConfig { db_file: parsed.preferences.db_file },
        secrets,
    })
}

fn parse_search_backend(name: &str) -> Result<SearchBackend, AppError> {
    match name {
        "google" => Ok(SearchBackend::Google),
        "serper" => Ok(SearchBackend::Serper),
        "dummy" => Ok(SearchBackend::Dummy),
        other => Err(AppError::Config(format!("unknown search provider: {other}"))),
    }
}

fn parse_llm_backend(name: &str) -> Result<LlmBackend, AppError> {
    match name {
        "gemini" => Ok(LlmBackend::Gemini),
        "openai" | "openai-compatible" => Ok(LlmBackend::OpenAiCompatible),
        "dummy" => Ok(LlmBackend::Dummy),
        other => Err(AppError::Config(format!("unknown llm provider: {other}"))),
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Offline `Config`: dummy backends everywhere, no credentials.
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            prompts_dir: work_dir.join("prompts"),
            http_timeout_seconds: None,
            comms: CommsConfig {
                http: HttpConfig { enabled: false, bind: default_http_bind() },
                console: ConsoleConfig { enabled: false },
            },
            search: SearchConfig {
                providers: vec![SearchBackend::Dummy],
                num_results: default_num_results(),
                google: GoogleSearchConfig {
                    endpoint: "http://localhost:0/customsearch/v1".into(),
                    news_date_restrict: default_news_date_restrict(),
                },
                serper: SerperConfig {
                    search_endpoint: "http://localhost:0/search".into(),
                    news_endpoint: "http://localhost:0/news".into(),
                    time_filter: default_serper_time_filter(),
                },
            },
            llm: LlmConfig {
                tiers: vec![TierConfig {
                    backend: LlmBackend::Dummy,
                    model: "test-model".into(),
                    api_base_url: String::new(),
                    temperature: None,
                }],
            },
            image: ImageConfig { backend: ImageBackend::Dummy, endpoint: String::new() },
            social: SocialConfig {
                backend: SocialBackend::Dummy,
                api_base_url: String::new(),
                permalink_base: default_permalink_base(),
                max_post_chars: default_max_post_chars(),
            },
            preferences: PreferencesConfig { db_file: default_db_file() },
            secrets: Secrets::default(),
        }
    }
}
