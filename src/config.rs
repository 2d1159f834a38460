use crate::view::Column;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_PATH_ENV_VAR: &str = "GPUUTIL_CONFIG";
const CONFIG_FILE_NAME: &str = ".gpuutil.conf";

/// Replay sources for captured tool output, used instead of running
/// the real binaries when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Redirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nvsmi_src: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps_src: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_src: Option<PathBuf>,
}

impl Redirect {
    pub fn is_empty(&self) -> bool {
        self.nvsmi_src.is_none() && self.apps_src.is_none() && self.ps_src.is_none()
    }
}

/// A saved set of display options, applied under the flags a user
/// passes explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Vec<Option<usize>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_command: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// `$GPUUTIL_CONFIG`, or `~/.gpuutil.conf`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
            return PathBuf::from(path);
        }
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(CONFIG_FILE_NAME)
    }

    /// A missing file is an empty config; an unreadable one is an error.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            debug!("No config file at {:?}", path);
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {path:?}"))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let as_json = serde_json::to_string_pretty(self)?;
        fs::write(path, as_json)
            .with_context(|| format!("failed to write config file {path:?}"))
    }
}
