use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "humbaba.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub sad_panda: SadPandaConfig,
    pub file_hosts: FileHosts,
    pub data_directory: Option<PathBuf>,
}

/// The three session cookies; any of them may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SadPandaConfig {
    pub igneous: Option<String>,
    pub ipb_member_id: Option<String>,
    pub ipb_pass_hash: Option<String>,
}

/// All three session cookies, known to be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SadPandaCredentials {
    pub igneous: String,
    pub ipb_member_id: String,
    pub ipb_pass_hash: String,
}

impl SadPandaCredentials {
    pub fn cookies(&self) -> [(&'static str, &str); 3] {
        [
            ("igneous", &self.igneous),
            ("ipb_member_id", &self.ipb_member_id),
            ("ipb_pass_hash", &self.ipb_pass_hash),
        ]
    }
}

impl SadPandaConfig {
    /// `None` unless every cookie is set to a non-blank value.
    pub fn credentials(&self) -> Option<SadPandaCredentials> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Some(SadPandaCredentials {
            igneous: present(&self.igneous)?,
            ipb_member_id: present(&self.ipb_member_id)?,
            ipb_pass_hash: present(&self.ipb_pass_hash)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHosts {
    pub catbox: CatboxConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatboxConfig {
    pub user_hash: Option<String>,
}

impl BotConfig {
    pub fn data_directory(&self) -> PathBuf {
        self.data_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("./data"))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_directory().join("humbaba.db")
    }

    /// Substitute `${VAR}` placeholders in every string value.
    fn expand_env(&mut self) {
        let sad_panda = &mut self.sad_panda;
        for (key, value) in [
            ("igneous", &mut sad_panda.igneous),
            ("ipb_member_id", &mut sad_panda.ipb_member_id),
            ("ipb_pass_hash", &mut sad_panda.ipb_pass_hash),
            ("user_hash", &mut self.file_hosts.catbox.user_hash),
        ] {
            if let Some(raw) = value.take() {
                *value = substitute_env_vars(&raw, |name| std::env::var(name).ok()).or_else(|| {
                    log::warn!("Config value '{}' refers to an unset environment variable", key);
                    None
                });
            }
        }

        if let Some(dir) = self.data_directory.take() {
            let raw = dir.to_string_lossy().to_string();
            self.data_directory =
                Some(substitute_env_vars(&raw, |name| std::env::var(name).ok()).map_or(dir, PathBuf::from));
        }
    }
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"))
}

/// Replace `${NAME}` with `lookup(NAME)`; `None` if any variable is unresolved.
pub fn substitute_env_vars(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let mut missing = false;
    let expanded = env_var_regex().replace_all(raw, |caps: &Captures| {
        lookup(&caps[1]).unwrap_or_else(|| {
            missing = true;
            String::new()
        })
    });
    if missing {
        None
    } else {
        Some(expanded.into_owned())
    }
}

pub fn parse_config(json: &str, path: &Path) -> Result<BotConfig, ConfigError> {
    let mut config: BotConfig = serde_json::from_str(json).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    config.expand_env();
    Ok(config)
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<BotConfig, ConfigError> {
    if !path.exists() {
        log::warn!("No config file at {}, using defaults", path.display());
        return Ok(BotConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content, path)
}
