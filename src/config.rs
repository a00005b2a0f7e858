use std::path::Path;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "jira-chat.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the chat server
    #[arg(long, env = "JIRA_CHAT_URL")]
    pub base_url: Option<String>,

    /// Session to open
    #[arg(long)]
    pub session: Option<String>,

    /// CSRF token to send instead of discovering one
    #[arg(long, env = "JIRA_CHAT_CSRF_TOKEN")]
    pub csrf_token: Option<String>,

    /// Assign created tickets to you
    #[arg(long)]
    pub auto_assign: Option<bool>,

    /// JSON file with the page's initial state (session, title, history)
    #[arg(long)]
    pub history_file: Option<String>,

    /// How replies are written to stdout
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,

    /// Log format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Reply text as it streams.
    Text,
    /// One JSON event per line.
    Events,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub session_id: Option<String>,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub connect_timeout_secs: u64,
    /// Zero disables the idle limit.
    pub stream_idle_timeout_secs: u64,
    pub auto_assign: Option<bool>,
    pub preferences_path: String,
    pub history_file: Option<String>,
    pub output: OutputMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_secs > 0)
            .then(|| Duration::from_secs(self.stream_idle_timeout_secs))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.base_url", "http://127.0.0.1:8000")?
            .set_default("client.connect_timeout_secs", 10)?
            .set_default("client.stream_idle_timeout_secs", 120)?
            .set_default("client.preferences_path", ".jira-chat/preferences.json")?
            .set_default("client.output", "text")?
            .set_default("log.format", "text")?
            .set_default("log.level", "info")?;

        // 2. Config file: explicit path must exist, the cwd fallback may not.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            }
            None => builder,
        };

        // 3. Environment variables, e.g. JIRA_CHAT_SERVER__BASE_URL
        builder = builder.add_source(
            Environment::with_prefix("JIRA_CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags win over everything
        if let Some(url) = cli.base_url {
            builder = builder.set_override("server.base_url", url)?;
        }
        if let Some(session) = cli.session {
            builder = builder.set_override("server.session_id", session)?;
        }
        if let Some(token) = cli.csrf_token {
            builder = builder.set_override("server.csrf_token", token)?;
        }
        if let Some(auto_assign) = cli.auto_assign {
            builder = builder.set_override("client.auto_assign", auto_assign)?;
        }
        if let Some(path) = cli.history_file {
            builder = builder.set_override("client.history_file", path)?;
        }
        if let Some(output) = cli.output {
            let value = match output {
                OutputMode::Text => "text",
                OutputMode::Events => "events",
            };
            builder = builder.set_override("client.output", value)?;
        }
        if let Some(format) = cli.log_format {
            let value = match format {
                LogFormat::Text => "text",
                LogFormat::Json => "json",
            };
            builder = builder.set_override("log.format", value)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
