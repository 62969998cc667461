use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "spendlog", about = "spendlog - expense and income record service")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "spendlog.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Storage backend (overrides config file)
    #[arg(short, long, value_enum)]
    pub storage: Option<StorageBackend>,

    /// Database location: a file path for sqlite, a connection string for postgres
    #[arg(long, env = "SPENDLOG_DATABASE_URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid listen address {0}")]
    ListenAddr(String),
    #[error("the postgres backend requires storage.url or --database-url")]
    MissingDatabaseUrl,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// SQLite database file.
    #[serde(default = "default_sqlite_path")]
    pub path: String,

    /// PostgreSQL connection string.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_sqlite_path() -> String {
    "spendlog.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: default_backend(),
            path: default_sqlite_path(),
            url: None,
        }
    }
}

impl Config {
    /// Reads the config file if it exists and applies CLI overrides. A
    /// missing file means defaults; a malformed one is an error.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::parse(&cli.config, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: cli.config.clone(),
                    source,
                })
            }
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(backend) = cli.storage {
            config.storage.backend = backend;
        }
        if let Some(ref location) = cli.database_url {
            match config.storage.backend {
                StorageBackend::Sqlite => config.storage.path = location.clone(),
                StorageBackend::Postgres => config.storage.url = Some(location.clone()),
                StorageBackend::Memory => {}
            }
        }

        if config.storage.backend == StorageBackend::Postgres && config.storage.url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        Ok(config)
    }

    pub fn parse(path: &str, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::ListenAddr(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        let mut argv = vec!["spendlog", "--config", "does-not-exist.toml"];
        argv.extend_from_slice(args);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, "spendlog.db");
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn test_parse_file() {
        let config = Config::parse(
            "spendlog.toml",
            r#"
            [server]
            port = 8080

            [logging]
            level = "debug"
            json = true

            [storage]
            backend = "postgres"
            url = "postgres://localhost/spendlog"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.logging.json);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.storage.url.as_deref(), Some("postgres://localhost/spendlog"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let result = Config::parse("spendlog.toml", "[storage]\nbackend = \"mongo\"");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_uses_defaults_with_overrides() {
        let config = Config::load(&cli(&["--port", "7000", "--storage", "memory"])).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_database_url_targets_selected_backend() {
        let config = Config::load(&cli(&["--storage", "sqlite", "--database-url", "/tmp/x.db"])).unwrap();
        assert_eq!(config.storage.path, "/tmp/x.db");

        let config = Config::load(&cli(&["--storage", "postgres", "--database-url", "postgres://db/x"])).unwrap();
        assert_eq!(config.storage.url.as_deref(), Some("postgres://db/x"));
    }

    #[test]
    fn test_postgres_without_url_is_an_error() {
        let mut args = cli(&["--storage", "postgres"]);
        args.database_url = None;
        assert!(matches!(Config::load(&args), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn test_invalid_listen_addr() {
        let mut config = Config::default();
        config.server.host = "not a host".to_string();
        assert!(matches!(config.listen_addr(), Err(ConfigError::ListenAddr(_))));
    }
}
