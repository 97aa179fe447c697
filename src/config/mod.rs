//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "brezza";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTENT_ROOT: &str = "content";
const DEFAULT_PAGE_SIZE: usize = 9;
const DEFAULT_HOME_POSTS: usize = 3;
const DEFAULT_RELATED_POSTS: usize = 3;
const DEFAULT_SITE_TITLE: &str = "Brezza";
const DEFAULT_SITE_TAGLINE: &str = "Notes on code, art, and everything between";
const DEFAULT_CONTACT_TIMEOUT_SECS: u64 = 10;

/// Command-line arguments for the Brezza binary.
#[derive(Debug, Parser)]
#[command(name = "brezza", version, about = "Brezza personal site server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BREZZA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Brezza HTTP server.
    Serve(Box<ServeArgs>),
    /// Validate the content root and exit.
    Check(CheckArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "PATH")]
    pub content_root: Option<PathBuf>,

    /// Override the number of posts per listing page.
    #[arg(long = "content-page-size", value_name = "COUNT")]
    pub content_page_size: Option<usize>,

    /// Override the contact relay endpoint URL.
    #[arg(long = "contact-endpoint", value_name = "URL")]
    pub contact_endpoint: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "PATH")]
    pub content_root: Option<PathBuf>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub site: SiteSettings,
    pub contact: ContactSettings,
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

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub root: PathBuf,
    pub page_size: usize,
    pub home_posts: usize,
    pub related_posts: usize,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub tagline: String,
    pub footer: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContactSettings {
    pub endpoint: Option<String>,
    pub timeout: Duration,
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

    builder = builder.add_source(Environment::with_prefix("BREZZA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Check(args)) => raw.apply_check_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    site: RawSiteSettings,
    contact: RawContactSettings,
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
        if let Some(root) = overrides.content_root.as_ref() {
            self.content.root = Some(root.clone());
        }
        if let Some(page_size) = overrides.content_page_size {
            self.content.page_size = Some(page_size);
        }
        if let Some(endpoint) = overrides.contact_endpoint.as_ref() {
            self.contact.endpoint = Some(endpoint.clone());
        }
    }

    fn apply_check_overrides(&mut self, args: &CheckArgs) {
        if let Some(root) = args.content_root.as_ref() {
            self.content.root = Some(root.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            site,
            contact,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let site = build_site_settings(site)?;
        let contact = build_contact_settings(contact)?;

        Ok(Self {
            server,
            logging,
            content,
            site,
            contact,
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

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

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
    let root = content
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("content.root", "path must not be empty"));
    }

    let page_size = content.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err(LoadError::invalid(
            "content.page_size",
            "must be greater than zero",
        ));
    }

    let home_posts = content.home_posts.unwrap_or(DEFAULT_HOME_POSTS);
    if home_posts == 0 {
        return Err(LoadError::invalid(
            "content.home_posts",
            "must be greater than zero",
        ));
    }

    let related_posts = content.related_posts.unwrap_or(DEFAULT_RELATED_POSTS);

    Ok(ContentSettings {
        root,
        page_size,
        home_posts,
        related_posts,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let title = site.title.unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());
    if title.trim().is_empty() {
        return Err(LoadError::invalid("site.title", "must not be empty"));
    }

    let tagline = site
        .tagline
        .unwrap_or_else(|| DEFAULT_SITE_TAGLINE.to_string());

    let footer = site
        .footer
        .unwrap_or_else(|| format!("© {title}. All rights reserved."));

    let base_url = site.base_url.and_then(|value| {
        let trimmed = value.trim().trim_end_matches('/');
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(SiteSettings {
        title,
        tagline,
        footer,
        base_url,
    })
}

fn build_contact_settings(contact: RawContactSettings) -> Result<ContactSettings, LoadError> {
    let endpoint = contact.endpoint.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    if let Some(endpoint) = endpoint.as_deref()
        && !endpoint.starts_with("http://")
        && !endpoint.starts_with("https://")
    {
        return Err(LoadError::invalid(
            "contact.endpoint",
            "must be an http(s) URL",
        ));
    }

    let timeout_secs = contact
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTACT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "contact.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContactSettings {
        endpoint,
        timeout: Duration::from_secs(timeout_secs),
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
    root: Option<PathBuf>,
    page_size: Option<usize>,
    home_posts: Option<usize>,
    related_posts: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    tagline: Option<String>,
    footer: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContactSettings {
    endpoint: Option<String>,
    timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn defaults_cover_a_bare_configuration() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.content.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.content.home_posts, DEFAULT_HOME_POSTS);
        assert_eq!(settings.content.related_posts, DEFAULT_RELATED_POSTS);
        assert_eq!(settings.content.root, PathBuf::from(DEFAULT_CONTENT_ROOT));
        assert!(settings.contact.endpoint.is_none());
        assert_eq!(settings.site.title, DEFAULT_SITE_TITLE);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut raw = RawSettings::default();
        raw.content.page_size = Some(0);
        let err = Settings::from_raw(raw).expect_err("zero page size");
        assert!(matches!(err, LoadError::Invalid { key, .. } if key == "content.page_size"));
    }

    #[test]
    fn contact_endpoint_must_be_http() {
        let mut raw = RawSettings::default();
        raw.contact.endpoint = Some("ftp://example.com/form".to_string());
        let err = Settings::from_raw(raw).expect_err("non-http endpoint");
        assert!(matches!(err, LoadError::Invalid { key, .. } if key == "contact.endpoint"));

        let mut raw = RawSettings::default();
        raw.contact.endpoint = Some("   ".to_string());
        let settings = Settings::from_raw(raw).expect("blank endpoint treated as unset");
        assert!(settings.contact.endpoint.is_none());
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["brezza"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "brezza",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--content-root",
            "/srv/site/content",
            "--contact-endpoint",
            "https://relay.example.com/f/abc",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(
                    serve.overrides.content_root.as_deref(),
                    Some(std::path::Path::new("/srv/site/content"))
                );
                assert_eq!(
                    serve.overrides.contact_endpoint.as_deref(),
                    Some("https://relay.example.com/f/abc")
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_check_arguments() {
        let args = CliArgs::parse_from(["brezza", "check", "--content-root", "/tmp/content"]);
        match args.command.expect("check command") {
            Command::Check(check) => {
                assert_eq!(
                    check.content_root.as_deref(),
                    Some(std::path::Path::new("/tmp/content"))
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn site_footer_defaults_from_title() {
        let mut raw = RawSettings::default();
        raw.site.title = Some("Windward".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.site.footer.contains("Windward"));
    }
}
