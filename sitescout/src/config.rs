use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::ScoutResult;
use crate::fetch::DEFAULT_USER_AGENT;
use crate::search::matcher::{PatternMatcher, DEFAULT_PATTERN};

/// Worker pool size used when none is configured
pub const DEFAULT_THREAD_COUNT: usize = 20;

/// Configuration for a scan run.
///
/// # Configuration Locations
///
/// Loaded from these locations, later ones overriding earlier ones:
/// 1. Global `$HOME/.config/sitescout/config.yaml`
/// 2. Local `.sitescout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # CSV of sites; the locator is in the second column
/// input_path: "urls.txt"
///
/// # One matching URL per line is appended here
/// output_path: "results.txt"
///
/// # Regex tested against every line of a page
/// pattern: ".*\\sand\\s.*"
/// case_sensitive: false
///
/// # Number of worker threads
/// thread_count: 20
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
///
/// user_agent: "Mozilla/5.0"
/// ```
///
/// Command-line arguments take precedence over file values, see `merge_with_cli`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// CSV input listing the sites to scan
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// File that receives matching URLs
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Regular expression tested against each line of content
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Patterns are case-insensitive unless this is set
    #[serde(default)]
    pub case_sensitive: bool,

    /// Number of worker threads; fixed for the whole run
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// User-Agent header sent with HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("urls.txt")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("results.txt")
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_THREAD_COUNT).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
            pattern: default_pattern(),
            case_sensitive: false,
            thread_count: default_thread_count(),
            log_level: default_log_level(),
            user_agent: default_user_agent(),
        }
    }
}

/// Values supplied on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub pattern: Option<String>,
    pub case_sensitive: bool,
    pub thread_count: Option<NonZeroUsize>,
    pub log_level: Option<String>,
    pub user_agent: Option<String>,
}

impl ScoutConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        for path in [
            dirs::config_dir().map(|p| p.join("sitescout/config.yaml")),
            Some(PathBuf::from(".sitescout.yaml")),
        ]
        .iter()
        .flatten()
        {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly named file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(input_path) = cli.input_path {
            self.input_path = input_path;
        }
        if let Some(output_path) = cli.output_path {
            self.output_path = output_path;
        }
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if cli.case_sensitive {
            self.case_sensitive = true;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        if let Some(user_agent) = cli.user_agent {
            self.user_agent = user_agent;
        }
        self
    }

    /// Compiles the configured pattern
    pub fn build_matcher(&self) -> ScoutResult<PatternMatcher> {
        PatternMatcher::with_case_sensitivity(&self.pattern, self.case_sensitive)
    }
}
