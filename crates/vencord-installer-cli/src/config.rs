//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/vencord-installer/config.toml` by default. Every key is
//! optional:
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:18281"
//! allowed_origin = "https://vencord.dev"
//! operation_timeout_secs = 120
//!
//! [discord]
//! search_roots = ["/opt", "/home/me/.local/share"]
//! dist_dir = "/home/me/.local/share/vencord-installer/dist"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vencord_installer_discord::fs::{FsSourceConfig, default_search_roots};
use vencord_installer_server::{DEFAULT_ALLOWED_ORIGIN, DEFAULT_PATH, DEFAULT_PORT, ServerConfig};

use crate::cli::ServeArgs;

/// Configuration for the vencord-installer binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebSocket server settings.
    pub server: ServerSettings,

    /// Discord discovery and artifact settings.
    pub discord: DiscordSettings,
}

/// WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to listen on.
    pub listen: SocketAddr,

    /// The only Origin allowed to connect.
    pub allowed_origin: String,

    /// Upgrade path.
    pub path: String,

    /// Maximum concurrently open connections.
    pub max_connections: usize,

    /// Handshake timeout in seconds.
    pub handshake_timeout_secs: u64,

    /// Per-operation timeout in seconds; unset means no limit.
    pub operation_timeout_secs: Option<u64>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            path: DEFAULT_PATH.to_string(),
            max_connections: 16,
            handshake_timeout_secs: 10,
            operation_timeout_secs: None,
        }
    }
}

/// Discord discovery and artifact settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    /// Directories scanned for installations; empty means platform defaults.
    pub search_roots: Vec<PathBuf>,

    /// Where downloaded Vencord and OpenAsar files are kept.
    pub dist_dir: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vencord-installer")
    }

    /// Returns the default artifact directory.
    pub fn default_dist_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vencord-installer")
            .join("dist")
    }

    /// Applies `serve` flags on top of the file values.
    pub fn apply_serve_args(&mut self, args: &ServeArgs) {
        if let Some(listen) = args.listen {
            self.server.listen = listen;
        }
        if let Some(ref origin) = args.allowed_origin {
            self.server.allowed_origin = origin.clone();
        }
        if let Some(secs) = args.operation_timeout {
            self.server.operation_timeout_secs = Some(secs);
        }
    }

    /// The effective artifact directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.discord
            .dist_dir
            .clone()
            .unwrap_or_else(Self::default_dist_dir)
    }

    /// Builds the server configuration.
    pub fn server_config(&self) -> ServerConfig {
        let s = &self.server;
        ServerConfig::new(s.listen)
            .with_allowed_origin(&s.allowed_origin)
            .with_path(&s.path)
            .with_max_connections(s.max_connections)
            .with_handshake_timeout(Duration::from_secs(s.handshake_timeout_secs))
            .with_operation_timeout(s.operation_timeout_secs.map(Duration::from_secs))
    }

    /// Builds the discovery configuration.
    pub fn source_config(&self) -> FsSourceConfig {
        let roots = if self.discord.search_roots.is_empty() {
            default_search_roots()
        } else {
            self.discord.search_roots.clone()
        };
        FsSourceConfig::new(self.dist_dir()).with_search_roots(roots)
    }

    /// Checks every setting that can be checked without binding.
    pub fn validate(&self) -> Result<(), String> {
        self.server_config().validate().map_err(|e| e.to_string())?;
        if self.server.handshake_timeout_secs == 0 {
            return Err("handshake_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.to_string(), "127.0.0.1:18281");
        assert_eq!(config.server.allowed_origin, "https://vencord.dev");
        assert_eq!(config.server.path, "/launch");
        assert!(config.discord.search_roots.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [server]
            allowed_origin = "http://localhost:3000"
            operation_timeout_secs = 5

            [discord]
            search_roots = ["/srv/apps"]
            dist_dir = "/srv/dist"
            "#,
        )
        .unwrap();

        let server = config.server_config();
        assert_eq!(server.allowed_origin, "http://localhost:3000");
        assert_eq!(server.operation_timeout, Some(Duration::from_secs(5)));
        assert_eq!(server.max_connections, 16);

        let source = config.source_config();
        assert_eq!(source.search_roots, vec![PathBuf::from("/srv/apps")]);
        assert_eq!(source.patcher_path(), PathBuf::from("/srv/dist/patcher.js"));
    }

    #[test]
    fn serve_args_override_file() {
        let mut config: Config =
            toml::from_str("[server]\nlisten = \"127.0.0.1:1000\"\n").unwrap();
        config.apply_serve_args(&ServeArgs {
            listen: Some("127.0.0.1:2000".parse().unwrap()),
            allowed_origin: None,
            operation_timeout: Some(60),
        });

        assert_eq!(config.server.listen.port(), 2000);
        assert_eq!(config.server.allowed_origin, "https://vencord.dev");
        assert_eq!(config.server.operation_timeout_secs, Some(60));
    }

    #[test]
    fn validate_rejects_bad_origin() {
        let mut config = Config::default();
        config.server.allowed_origin = "https://vencord.dev/launch".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_listen_address_fails_to_parse() {
        assert!(toml::from_str::<Config>("[server]\nlisten = \"localhost\"\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[discord]\ndist_dir = \"/tmp/dist\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.dist_dir(), PathBuf::from("/tmp/dist"));

        let err = Config::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.starts_with("failed to read config"));
    }

    #[test]
    fn dump_roundtrips() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.listen, config.server.listen);
    }
}
