//! User configuration and workspace path resolution.
//!
//! The config file lives at `$XDG_CONFIG_HOME/threadkeeper/config.toml`, or
//! `~/.config/threadkeeper/config.toml` when that variable is unset:
//!
//! ```toml
//! default_workspace = "~/notes/threads"
//! date_locale = "us"
//! ```
//!
//! The workspace directory is chosen by precedence: an explicit path from the
//! caller, then `THREADKEEPER_WORKSPACE`, then `default_workspace`, then
//! `$XDG_DATA_HOME/threadkeeper`, then `~/.local/share/threadkeeper`.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tk_types::DateLocale;
use tracing::debug;

use crate::error::{SdkError, SdkResult};

pub const APP_DIR: &str = "threadkeeper";
pub const CONFIG_FILE: &str = "config.toml";
pub const WORKSPACE_ENV: &str = "THREADKEEPER_WORKSPACE";
/// Thread-collection root, relative to the workspace.
pub const THREADS_DIR: &str = "threads";

/// Contents of `config.toml`. Unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_workspace: Option<String>,
    pub date_locale: DateLocale,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> SdkResult<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(SdkError::io(path)(e)),
        };
        Self::from_toml(&text).map_err(|e| SdkError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from the standard location for `environment`.
    pub fn load(environment: &Environment) -> SdkResult<Self> {
        Self::load_from(&environment.config_path()?)
    }
}

/// Snapshot of the process environment relevant to path resolution.
///
/// Captured once so that resolution stays a pure function of its inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    pub home: Option<PathBuf>,
    pub xdg_config_home: Option<PathBuf>,
    pub xdg_data_home: Option<PathBuf>,
    pub workspace: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            home: non_empty(env::var_os("HOME")).map(PathBuf::from),
            xdg_config_home: non_empty(env::var_os("XDG_CONFIG_HOME")).map(PathBuf::from),
            xdg_data_home: non_empty(env::var_os("XDG_DATA_HOME")).map(PathBuf::from),
            workspace: non_empty(env::var_os(WORKSPACE_ENV))
                .and_then(|v| v.into_string().ok())
                .filter(|v| !v.trim().is_empty()),
        }
    }

    fn home(&self) -> SdkResult<&Path> {
        self.home.as_deref().ok_or(SdkError::NoHome)
    }

    pub fn config_path(&self) -> SdkResult<PathBuf> {
        let base = match &self.xdg_config_home {
            Some(base) => base.clone(),
            None => self.home()?.join(".config"),
        };
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn default_data_dir(&self) -> SdkResult<PathBuf> {
        let base = match &self.xdg_data_home {
            Some(base) => base.clone(),
            None => self.home()?.join(".local").join("share"),
        };
        Ok(base.join(APP_DIR))
    }

    /// Expand a leading `~` or `~/` to the home directory.
    pub fn expand_user(&self, raw: &str) -> SdkResult<PathBuf> {
        let raw = raw.trim();
        if raw == "~" {
            return Ok(self.home()?.to_path_buf());
        }
        match raw.strip_prefix("~/") {
            Some(rest) => Ok(self.home()?.join(rest)),
            None => Ok(PathBuf::from(raw)),
        }
    }
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
    value.filter(|v| !v.is_empty())
}

/// Resolved locations of a workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub workspace: PathBuf,
    pub threads: PathBuf,
}

impl WorkspacePaths {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let threads = workspace.join(THREADS_DIR);
        Self { workspace, threads }
    }
}

/// Pick the workspace directory by precedence.
pub fn resolve_workspace(
    explicit: Option<&str>,
    environment: &Environment,
    config: &Config,
) -> SdkResult<WorkspacePaths> {
    let explicit = explicit.map(str::trim).filter(|p| !p.is_empty());
    let configured = config
        .default_workspace
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let workspace = if let Some(path) = explicit {
        environment.expand_user(path)?
    } else if let Some(path) = environment.workspace.as_deref() {
        environment.expand_user(path)?
    } else if let Some(path) = configured {
        environment.expand_user(path)?
    } else {
        environment.default_data_dir()?
    };
    Ok(WorkspacePaths::new(workspace))
}
