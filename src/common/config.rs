//! Configuration file handling
//!
//! Settings come from a TOML file (explicit `--config`, or the platform
//! config dir), with command-line overrides applied on top.

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};
use crate::store::Fault;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where the target's source comes from and how its dependencies are installed
    #[serde(default)]
    pub repo: RepoConfig,

    /// The process under test and how the harness talks to it
    #[serde(default)]
    pub target: TargetConfig,

    /// Virtual display settings
    #[serde(default)]
    pub display: DisplayConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// The conversation used by the scenario
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

/// Source acquisition and dependency installation
#[derive(Debug, Deserialize)]
pub struct RepoConfig {
    /// Git URL or local path of the target repository
    pub location: Option<String>,

    /// Directory the source lives in (derived from `location` when unset)
    pub workdir: Option<PathBuf>,

    /// Dependency installation command, run inside the workdir
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    /// Path (relative to the workdir) whose presence means dependencies are installed
    #[serde(default = "default_install_marker")]
    pub install_marker: Option<PathBuf>,

    /// Paths (relative to the workdir) removed before installing dependencies
    #[serde(default)]
    pub prune: Vec<PathBuf>,

    /// Run the install command even when the marker exists
    #[serde(default)]
    pub force_install: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            location: None,
            workdir: None,
            install_command: default_install_command(),
            install_marker: default_install_marker(),
            prune: Vec::new(),
            force_install: false,
        }
    }
}

fn default_install_command() -> Vec<String> {
    vec!["npm".to_string(), "install".to_string()]
}

fn default_install_marker() -> Option<PathBuf> {
    Some(PathBuf::from("node_modules"))
}

impl RepoConfig {
    /// Resolve the directory the target runs in
    ///
    /// An explicit workdir wins. Otherwise the repository name is taken from
    /// the location (`.../Signal-Desktop.git` -> `Signal-Desktop`) relative to
    /// the current directory, falling back to the current directory itself.
    pub fn resolved_workdir(&self) -> PathBuf {
        if let Some(dir) = &self.workdir {
            return dir.clone();
        }

        self.location
            .as_deref()
            .and_then(repo_dir_name)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Reject prune paths that would reach outside the workdir
    pub fn validate(&self) -> Result<()> {
        for path in &self.prune {
            let escapes = path.is_absolute()
                || path
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
            if escapes {
                return Err(Error::Config(format!(
                    "prune path '{}' must stay inside the workdir",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

fn repo_dir_name(location: &str) -> Option<String> {
    let last = location
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\', ':'])
        .next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Which conversation surface the scenario drives
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// In-process store, no preparation or launch (harness self-test)
    Mock,
    /// Out-of-process target reached over a local socket
    #[default]
    Ipc,
}

/// Target process settings
#[derive(Debug, Deserialize, Default)]
pub struct TargetConfig {
    /// Surface variant to drive
    #[serde(default)]
    pub surface: SurfaceKind,

    /// Command (argv) that starts the target; the built-in surrogate when unset
    pub command: Option<Vec<String>>,

    /// Socket the target listens on; a per-run path when unset
    pub socket: Option<PathBuf>,

    /// Fault injected into the mock surface or built-in surrogate
    #[serde(default)]
    pub fault: Fault,
}

/// Virtual display mode
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Inherit whatever display the harness has
    #[default]
    None,
    /// Start a virtual X server when no display is available
    Virtual,
}

/// Virtual display configuration
#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub mode: DisplayMode,

    /// X server executable
    #[serde(default = "default_display_server")]
    pub server: String,

    /// Display number (`:99`)
    #[serde(default = "default_display_number")]
    pub number: u32,

    /// Extra arguments for the X server
    #[serde(default = "default_display_args")]
    pub args: Vec<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            server: default_display_server(),
            number: default_display_number(),
            args: default_display_args(),
        }
    }
}

fn default_display_server() -> String {
    "Xvfb".to_string()
}
fn default_display_number() -> u32 {
    99
}
fn default_display_args() -> Vec<String> {
    vec!["-ac".to_string()]
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Upper bound for a launched process to pass its readiness check
    #[serde(default = "default_startup_grace")]
    pub startup_grace_seconds: u64,

    /// Upper bound for each create/delete/lookup call
    #[serde(default = "default_operation")]
    pub operation_seconds: u64,

    /// Upper bound for the whole run before teardown
    #[serde(default = "default_overall")]
    pub overall_timeout_seconds: u64,

    /// How long a process gets to exit after SIGTERM before it is killed
    #[serde(default = "default_terminate_grace")]
    pub terminate_grace_seconds: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup_grace_seconds: default_startup_grace(),
            operation_seconds: default_operation(),
            overall_timeout_seconds: default_overall(),
            terminate_grace_seconds: default_terminate_grace(),
        }
    }
}

fn default_startup_grace() -> u64 {
    10
}
fn default_operation() -> u64 {
    10
}
fn default_overall() -> u64 {
    60
}
fn default_terminate_grace() -> u64 {
    5
}

/// Scenario parameters
///
/// Also the schema of a `--scenario` YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_scenario_name")]
    pub name: String,

    pub description: Option<String>,

    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,

    #[serde(default = "default_conversation_name")]
    pub conversation_name: String,

    /// Ask the target to resync before the final lookup
    #[serde(default)]
    pub resync_before_verify: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: default_scenario_name(),
            description: None,
            conversation_id: default_conversation_id(),
            conversation_name: default_conversation_name(),
            resync_before_verify: false,
        }
    }
}

fn default_scenario_name() -> String {
    "conversation deletion".to_string()
}
fn default_conversation_id() -> String {
    "test-conversation".to_string()
}
fn default_conversation_name() -> String {
    "Test Conversation".to_string()
}

impl ScenarioConfig {
    /// Load scenario parameters from a YAML file
    pub fn load_yaml(path: &Path) -> Result<Self> {
        let content = read_file(path)?;
        let scenario: Self = serde_yaml::from_str(&content).map_err(|e| {
            Error::ConfigParse(format!("scenario '{}': {}", path.display(), e))
        })?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.conversation_id.trim().is_empty() {
            return Err(Error::Config("conversation_id must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub repo: Option<String>,
    pub workdir: Option<PathBuf>,
    pub display: Option<DisplayMode>,
    pub surface: Option<SurfaceKind>,
    pub fault: Option<Fault>,
    pub startup_grace_seconds: Option<u64>,
    pub overall_timeout_seconds: Option<u64>,
    pub scenario: Option<PathBuf>,
    pub force_install: bool,
    pub skip_prepare: bool,
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if no file exists. An explicit path that
    /// does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_str(&read_file(path)?);
        }

        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_toml_str(&read_file(&path)?);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.repo.validate()?;
        config.scenario.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(repo) = overrides.repo {
            self.repo.location = Some(repo);
        }
        if let Some(workdir) = overrides.workdir {
            self.repo.workdir = Some(workdir);
        }
        if overrides.skip_prepare {
            self.repo.location = None;
        }
        if overrides.force_install {
            self.repo.force_install = true;
        }
        if let Some(mode) = overrides.display {
            self.display.mode = mode;
        }
        if let Some(surface) = overrides.surface {
            self.target.surface = surface;
        }
        if let Some(fault) = overrides.fault {
            self.target.fault = fault;
        }
        if let Some(secs) = overrides.startup_grace_seconds {
            self.timeouts.startup_grace_seconds = secs;
        }
        if let Some(secs) = overrides.overall_timeout_seconds {
            self.timeouts.overall_timeout_seconds = secs;
        }
        if let Some(path) = overrides.scenario {
            self.scenario = ScenarioConfig::load_yaml(&path)?;
        }

        if self.timeouts.overall_timeout_seconds == 0 {
            return Err(Error::Config(
                "overall_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if matches!(&self.target.command, Some(argv) if argv.is_empty()) {
            return Err(Error::Config("target.command must not be empty".to_string()));
        }
        self.repo.validate()
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}
