//! CLI argument definitions for the Wayfind application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wayfind_core::WayfindConfig;

/// Wayfind - ask for places in plain language and see them on a map.
#[derive(Parser, Debug)]
#[command(name = "wayfind", version, about)]
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

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the places proxy that holds the Google Maps key.
    Serve {
        /// Proxy listen port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Start an interactive chat session in the terminal.
    Chat {
        /// Base URL of the places proxy.
        #[arg(long = "backend-url")]
        backend_url: Option<String>,

        /// Base URL of the Ollama server.
        #[arg(long = "ollama-url")]
        ollama_url: Option<String>,

        /// Model used for intent extraction.
        #[arg(short = 'm', long = "model")]
        model: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > WAYFIND_CONFIG env var > ~/.wayfind/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("WAYFIND_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag and environment overrides on top of the loaded config.
    pub fn apply(&self, config: &mut WayfindConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Ok(key) = std::env::var("GOOGLE_MAPS_API_KEY") {
            config.proxy.google_api_key = Some(key);
        }

        match &self.command {
            Command::Serve { port } => {
                config.proxy.port = resolve_port(*port, config.proxy.port);
            }
            Command::Chat {
                backend_url,
                ollama_url,
                model,
            } => {
                config.places.backend_url =
                    resolve_string(backend_url, "WAYFIND_BACKEND_URL", &config.places.backend_url);
                config.assistant.base_url =
                    resolve_string(ollama_url, "WAYFIND_OLLAMA_URL", &config.assistant.base_url);
                if let Some(model) = model {
                    config.assistant.model = model.clone();
                }
            }
        }
    }
}

/// Priority: --port flag > WAYFIND_PORT env var > config file value > 3001.
fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(val) = std::env::var("WAYFIND_PORT") {
        if let Ok(p) = val.parse::<u16>() {
            return p;
        }
    }
    if config_port != 0 {
        return config_port;
    }
    3001
}

fn resolve_string(flag: &Option<String>, env_var: &str, config_value: &str) -> String {
    if let Some(v) = flag {
        return v.clone();
    }
    match std::env::var(env_var) {
        Ok(v) if !v.is_empty() => v,
        _ => config_value.to_string(),
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".wayfind").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".wayfind").join("config.toml");
    }
    PathBuf::from("config.toml")
}
