//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::UtcOffset;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "encore";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATASET: &str = "production";
const DEFAULT_API_VERSION: &str = "2024-11-01";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_L1_RESPONSE_LIMIT: usize = 200;
const DEFAULT_L1_RESPONSE_BODY_LIMIT_BYTES: usize = 512 * 1024;
const DEFAULT_SITE_TITLE: &str = "Encore";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub webhook: WebhookSettings,
    pub cache: CacheSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Connection details for the headless content store.
#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    /// Replaces the project-derived API host when set.
    pub api_base_url: Option<Url>,
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct WebhookSettings {
    pub secret: String,
}

impl std::fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_l1_cache: bool,
    pub l1_response_limit: usize,
    pub l1_response_body_limit_bytes: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enable_l1_cache: true,
            l1_response_limit: DEFAULT_L1_RESPONSE_LIMIT,
            l1_response_body_limit_bytes: DEFAULT_L1_RESPONSE_BODY_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub public_url: Url,
    /// Offset used for calendar-day status and displayed times.
    pub utc_offset: UtcOffset,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("ENCORE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    webhook: RawWebhookSettings,
    cache: RawCacheSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(project) = overrides.content_project_id.as_ref() {
            self.content.project_id = Some(project.clone());
        }
        if let Some(dataset) = overrides.content_dataset.as_ref() {
            self.content.dataset = Some(dataset.clone());
        }
        if let Some(url) = overrides.content_api_base_url.as_ref() {
            self.content.api_base_url = Some(url.clone());
        }
        if let Some(use_cdn) = overrides.content_use_cdn {
            self.content.use_cdn = Some(use_cdn);
        }
        if let Some(secret) = overrides.webhook_secret.as_ref() {
            self.webhook.secret = Some(secret.clone());
        }
        if let Some(enabled) = overrides.cache_enable_l1 {
            self.cache.enable_l1_cache = Some(enabled);
        }
        if let Some(url) = overrides.site_public_url.as_ref() {
            self.site.public_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            webhook,
            cache,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            content: build_content_settings(content)?,
            webhook: build_webhook_settings(webhook)?,
            cache: build_cache_settings(cache),
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let project_id = non_empty(content.project_id)
        .ok_or_else(|| LoadError::invalid("content.project_id", "must be set"))?;
    if !project_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(LoadError::invalid(
            "content.project_id",
            "may only contain ASCII letters, digits and hyphens",
        ));
    }

    let dataset = non_empty(content.dataset).unwrap_or_else(|| DEFAULT_DATASET.to_string());
    let api_version =
        non_empty(content.api_version).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    let api_version = api_version.trim_start_matches('v').to_string();

    let api_base_url = match non_empty(content.api_base_url) {
        Some(raw) => Some(
            Url::parse(&raw)
                .map_err(|err| LoadError::invalid("content.api_base_url", err.to_string()))?,
        ),
        None => None,
    };

    let timeout_secs = content
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSettings {
        project_id,
        dataset,
        api_version,
        use_cdn: content.use_cdn.unwrap_or(false),
        api_base_url,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_webhook_settings(webhook: RawWebhookSettings) -> Result<WebhookSettings, LoadError> {
    let secret = non_empty(webhook.secret)
        .ok_or_else(|| LoadError::invalid("webhook.secret", "must be set"))?;
    Ok(WebhookSettings { secret })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    let defaults = CacheSettings::default();
    CacheSettings {
        enable_l1_cache: cache.enable_l1_cache.unwrap_or(defaults.enable_l1_cache),
        l1_response_limit: cache.l1_response_limit.unwrap_or(defaults.l1_response_limit),
        l1_response_body_limit_bytes: cache
            .l1_response_body_limit_bytes
            .unwrap_or(defaults.l1_response_body_limit_bytes),
    }
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let title = non_empty(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    let public_url = non_empty(site.public_url).unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
    let public_url = Url::parse(&public_url)
        .map_err(|err| LoadError::invalid("site.public_url", err.to_string()))?;

    let minutes = site.utc_offset_minutes.unwrap_or(0);
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(LoadError::invalid(
            "site.utc_offset_minutes",
            "must be within ±18 hours",
        ));
    }
    let utc_offset = UtcOffset::from_whole_seconds(minutes * 60)
        .map_err(|err| LoadError::invalid("site.utc_offset_minutes", err.to_string()))?;

    Ok(SiteSettings {
        title,
        public_url,
        utc_offset,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    project_id: Option<String>,
    dataset: Option<String>,
    api_version: Option<String>,
    use_cdn: Option<bool>,
    api_base_url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebhookSettings {
    secret: Option<String>,
}

impl std::fmt::Debug for RawWebhookSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawWebhookSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_l1_cache: Option<bool>,
    l1_response_limit: Option<usize>,
    l1_response_body_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    public_url: Option<String>,
    utc_offset_minutes: Option<i32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
