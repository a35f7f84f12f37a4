//! Command-line interface for frogjump_telemetry.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use frogjump_telemetry::{ConfigError, TelemetryConfig};

/// Frog-jump telemetry - session, match and move recording backend
#[derive(Parser, Debug)]
#[command(name = "frogjump_telemetry")]
#[command(about = "Telemetry backend for the frog-jump VR puzzle", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "FROGJUMP_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config and DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP telemetry server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Print the difficulty catalog
    Difficulties,
}

impl Cli {
    /// Resolves configuration: defaults, then `--config`, then the
    /// environment, then flags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file or environment is invalid, or the
    /// result fails validation.
    pub fn resolve_config<F>(&self, lookup: F) -> Result<TelemetryConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match &self.config {
            Some(path) => TelemetryConfig::from_file(path)?,
            None => TelemetryConfig::default(),
        };
        let mut config = base.apply_env(lookup)?;

        if let Some(url) = &self.database_url {
            let store = config.store().clone().with_database_url(url.clone());
            config = config.with_store(store);
        }
        if let Command::Serve { port, host } = &self.command {
            let mut server = config.server().clone();
            if let Some(port) = port {
                server = server.with_port(*port);
            }
            if let Some(host) = host {
                server = server.with_host(host.clone());
            }
            config = config.with_server(server);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from([
            "frogjump_telemetry",
            "--database-url",
            "flag.db",
            "serve",
            "--port",
            "9000",
        ]);
        let config = cli
            .resolve_config(|key| match key {
                "DATABASE_URL" => Some("env.db".to_string()),
                "PORT" => Some("7000".to_string()),
                _ => None,
            })
            .expect("config resolves");
        assert_eq!(config.store().database_url(), "flag.db");
        assert_eq!(*config.server().port(), 9000);
    }

    #[test]
    fn migrate_keeps_environment_values() {
        let cli = Cli::parse_from(["frogjump_telemetry", "migrate"]);
        let config = cli
            .resolve_config(|key| (key == "DATABASE_URL").then(|| "env.db".to_string()))
            .expect("config resolves");
        assert_eq!(config.store().database_url(), "env.db");
    }
}
