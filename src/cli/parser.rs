//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stremio add-on serving TMDB catalogs and metadata
#[derive(Parser, Debug)]
#[command(name = "tmdb-addon")]
#[command(about = "Stremio add-on serving TMDB catalogs and metadata")]
#[command(long_about = "
tmdb-addon serves Stremio manifest, catalog and meta resources backed by
The Movie Database. Responses are cached with stale-while-revalidate and
stale-if-error windows so clients keep getting answers while TMDB is slow
or unavailable.

EXAMPLES:
    # Start the server with default configuration
    tmdb-addon serve

    # Start server on custom host and port
    tmdb-addon serve --host 0.0.0.0 --port 7000

    # Use custom configuration file
    tmdb-addon --config /path/to/addon.toml serve

    # Run in production mode with verbose logging
    tmdb-addon --env production --verbose serve

    # Check configuration without starting server
    tmdb-addon serve --dry-run

The TMDB API key is read from tmdb.api_key or TMDB_ADDON_TMDB__API_KEY.
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load a single TOML file instead of the layered files under config/.
    /// TMDB_ADDON_* environment variables still override its values.
    ///
    /// Example: --config /etc/tmdb-addon/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which {environment}.toml layer is loaded on top of default.toml.
    ///
    /// Available values: development (dev), staging (stage), production (prod), test
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Sets the log level to debug. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Sets the log level to error. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the add-on server (default)
    ///
    /// Binds to the configured address, opens the response cache and begins
    /// answering Stremio requests.
    ///
    /// Examples:
    ///   tmdb-addon serve                            # Start with defaults
    ///   tmdb-addon serve --host 0.0.0.0 --port 7000 # Listen on all interfaces
    ///   tmdb-addon serve --language de-DE           # German metadata by default
    ///   tmdb-addon serve --dry-run                  # Validate config without starting
    Serve {
        /// Host address to bind to
        ///
        /// Use 127.0.0.1 for localhost only, or 0.0.0.0 to accept connections
        /// from any interface.
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Port number to listen on
        ///
        /// Must be between 1 and 65535.
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level override
        ///
        /// Takes precedence over the configuration file and --verbose/--quiet.
        ///
        /// Available levels: error, warn, info, debug, trace
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Language used when a request carries no add-on configuration
        #[arg(long, value_name = "LANG", value_parser = super::validation::validate_language)]
        language: Option<String>,

        /// Validate configuration and exit
        ///
        /// Returns exit code 0 if the configuration is valid, non-zero otherwise.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "test")]
    Test,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl Cli {
    /// Checks argument combinations clap cannot express on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        Ok(())
    }

    /// Returns true when the process should go on to start the server
    pub fn starts_server(&self) -> bool {
        match &self.command {
            Some(Commands::Serve { dry_run, .. }) => !dry_run,
            None => true,
        }
    }

    /// Get detailed help for validation errors
    pub fn get_validation_help() -> &'static str {
        r#"
Common validation errors and solutions:

Port validation:
  - Port must be between 1 and 65535
  - Example: --port 7000

Host validation:
  - Use 'localhost' or '127.0.0.1' for local access only
  - Use '0.0.0.0' to accept connections from any interface
  - Example: --host 0.0.0.0

Language validation:
  - Two lowercase letters, optionally followed by a region
  - Example: --language pt-BR

Configuration file validation:
  - File must exist and be readable
  - File must be in TOML format and set tmdb.api_key
  - Example: --config /path/to/addon.toml

For more help, use: tmdb-addon help <subcommand>
"#
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
            Environment::Test => crate::config::Environment::Test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["tmdb-addon", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["tmdb-addon", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["tmdb-addon"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
        assert!(cli.starts_server());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from([
            "tmdb-addon",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "7000",
            "--language",
            "de-DE",
        ])
        .unwrap();
        let Some(Commands::Serve {
            host,
            port,
            language,
            dry_run,
            ..
        }) = &cli.command
        else {
            panic!("Expected Serve command");
        };
        assert_eq!(host.as_deref(), Some("0.0.0.0"));
        assert_eq!(*port, Some(7000));
        assert_eq!(language.as_deref(), Some("de-DE"));
        assert!(!dry_run);
        assert!(cli.starts_server());
    }

    #[test]
    fn test_dry_run_does_not_start_server() {
        let cli = Cli::try_parse_from(["tmdb-addon", "serve", "--dry-run"]).unwrap();
        assert!(!cli.starts_server());
    }

    #[test]
    fn test_invalid_language_rejected() {
        let result = Cli::try_parse_from(["tmdb-addon", "serve", "--language", "german"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_aliases() {
        let cli = Cli::try_parse_from(["tmdb-addon", "--env", "prod"]).unwrap();
        assert!(matches!(cli.env, Some(Environment::Production)));
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::try_parse_from(["tmdb-addon", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["tmdb-addon", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
