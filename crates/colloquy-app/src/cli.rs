//! CLI argument definitions for the Colloquy binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Colloquy - chat front end and reference conversation server.
#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the reference conversation server.
    Serve {
        /// Port to listen on.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
        /// Address to bind.
        #[arg(long = "host")]
        host: Option<String>,
    },
    /// Open the interactive chat front end.
    Chat {
        /// Base URL of the conversation server.
        #[arg(short = 'u', long = "url")]
        url: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > COLLOQUY_CONFIG env var > ~/.colloquy/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("COLLOQUY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the server port.
    ///
    /// Priority: --port flag > COLLOQUY_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Command::Serve { port: Some(p), .. } = self.command {
            return p;
        }
        std::env::var("COLLOQUY_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Resolve the server bind host. Priority: --host flag > config file.
    pub fn resolve_host(&self, config_host: &str) -> String {
        match &self.command {
            Command::Serve { host: Some(h), .. } => h.clone(),
            _ => config_host.to_string(),
        }
    }

    /// Resolve the conversation server URL.
    ///
    /// Priority: --url flag > COLLOQUY_URL env var > config file value.
    pub fn resolve_url(&self, config_url: &str) -> String {
        if let Command::Chat { url: Some(u) } = &self.command {
            return u.clone();
        }
        std::env::var("COLLOQUY_URL").unwrap_or_else(|_| config_url.to_string())
    }

    /// Resolve the log level. Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".colloquy").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".colloquy").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let args = CliArgs::try_parse_from(["colloquy", "serve", "--port", "4000"]).unwrap();
        assert_eq!(
            args.command,
            Command::Serve {
                port: Some(4000),
                host: None,
            }
        );
        assert_eq!(args.resolve_port(3040), 4000);
    }

    #[test]
    fn test_parse_chat_with_url_and_global_flags() {
        let args = CliArgs::try_parse_from([
            "colloquy",
            "chat",
            "--url",
            "http://10.0.0.2:3040",
            "--log-level",
            "debug",
            "-c",
            "/tmp/colloquy.toml",
        ])
        .unwrap();
        assert_eq!(args.resolve_url("http://127.0.0.1:3040"), "http://10.0.0.2:3040");
        assert_eq!(args.resolve_log_level("info"), "debug");
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/colloquy.toml"));
    }

    #[test]
    fn test_host_falls_back_to_config() {
        let args = CliArgs::try_parse_from(["colloquy", "serve"]).unwrap();
        assert_eq!(args.resolve_host("0.0.0.0"), "0.0.0.0");
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["colloquy"]).is_err());
    }
}
