//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vencord_installer_core::TracingOutputFormat;

/// vencord-installer - let vencord.dev manage your local Discord installs
#[derive(Debug, Parser)]
#[command(name = "vencord-installer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "VENCORD_INSTALLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the WebSocket server in the foreground (default)
    Serve(ServeArgs),

    /// List Discord installations found on this machine
    List {
        /// Print the records as JSON, exactly as LIST_INSTALLS returns them
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `serve`; each overrides the matching config file value.
#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// The only Origin allowed to connect
    #[arg(long)]
    pub allowed_origin: Option<String>,

    /// Fail operations that take longer than this many seconds
    #[arg(long)]
    pub operation_timeout: Option<u64>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["vencord-installer"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn serve_flags() {
        let cli = Cli::try_parse_from([
            "vencord-installer",
            "-v",
            "serve",
            "--listen",
            "127.0.0.1:9000",
            "--allowed-origin",
            "http://localhost:3000",
            "--operation-timeout",
            "30",
        ])
        .unwrap();

        assert!(cli.debug);
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.listen, Some("127.0.0.1:9000".parse().unwrap()));
        assert_eq!(args.allowed_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(args.operation_timeout, Some(30));
    }

    #[test]
    fn list_json_and_log_format() {
        let cli =
            Cli::try_parse_from(["vencord-installer", "--log-format", "json", "list", "--json"])
                .unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(cli.command, Some(Command::List { json: true })));
    }

    #[test]
    fn rejects_bad_listen_address() {
        assert!(Cli::try_parse_from(["vencord-installer", "serve", "--listen", "nope"]).is_err());
    }
}
