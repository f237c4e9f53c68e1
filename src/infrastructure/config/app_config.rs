//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::infrastructure::image::ImageCacheConfig;

const APP_NAME: &str = "eventpix";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration from file and CLI.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// File the configuration was read from, when one was.
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Image cache configuration.
    #[serde(default)]
    pub cache: ImageCacheConfig,
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.cache_dir = Some(cache_dir.clone());
        }
        if let Some(max_age_secs) = args.max_age_secs {
            self.cache.max_age_secs = max_age_secs;
        }
        if let Some(max_memory_entries) = args.max_memory_entries {
            self.cache.max_memory_entries = max_memory_entries;
        }
        if let Some(timeout) = args.request_timeout_secs {
            self.cache.request_timeout_secs = Some(timeout);
        }
        if args.no_sweep {
            self.cache.sweep_on_start = false;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::args::Command;
    use clap::Parser;

    #[test]
    fn test_parse_config_file() {
        let toml_content = r#"
            log_level = "debug"

            [cache]
            cache_dir = "/var/cache/eventpix"
            max_age_secs = 3600
            coalesce_downloads = false
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.cache.cache_dir,
            Some(PathBuf::from("/var/cache/eventpix"))
        );
        assert_eq!(config.cache.max_age_secs, 3600);
        assert!(!config.cache.coalesce_downloads);
        assert_eq!(config.cache.max_memory_entries, 50);
        assert!(config.cache.sweep_on_start);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("Failed to parse config");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.cache, ImageCacheConfig::default());
    }

    #[test]
    fn test_args_override_file() {
        let args = CliArgs::parse_from([
            "eventpix",
            "--cache-dir",
            "/tmp/pix",
            "--max-age-secs",
            "60",
            "--no-sweep",
            "--log-level",
            "trace",
            "size",
        ]);
        let mut config = AppConfig::default();
        config.merge_with_args(&args);

        assert_eq!(config.cache.cache_dir, Some(PathBuf::from("/tmp/pix")));
        assert_eq!(config.cache.max_age_secs, 60);
        assert!(!config.cache.sweep_on_start);
        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(args.command, Command::Size { json: false });
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }
}
