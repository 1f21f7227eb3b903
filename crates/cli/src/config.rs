use agentos_markdown_splitter::SplitterConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "AGENTOS_HOME";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `<home>/config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentOsConfig {
    /// Agent metadata directory; relative paths are resolved against home
    pub agents_dir: Option<PathBuf>,
    /// Directory holding `bridges/`; relative paths are resolved against home
    pub bridges_base_dir: Option<PathBuf>,
    pub splitter: SplitterConfig,
}

impl AgentOsConfig {
    /// Load `<home>/config.toml`, falling back to defaults when it does not exist.
    pub fn load(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILE_NAME);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .splitter
            .validate()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid [splitter] section in {}", path.display()))?;
        Ok(config)
    }

    #[must_use]
    pub fn agents_dir(&self, home: &Path) -> PathBuf {
        resolve_under(home, self.agents_dir.as_deref(), "agents")
    }

    #[must_use]
    pub fn bridges_base_dir(&self, home: &Path) -> PathBuf {
        resolve_under(home, self.bridges_base_dir.as_deref(), "")
    }
}

fn resolve_under(home: &Path, configured: Option<&Path>, default: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => home.join(path),
        None if default.is_empty() => home.to_path_buf(),
        None => home.join(default),
    }
}

/// `--home`, then `$AGENTOS_HOME`, then the platform data directory.
pub fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(home) = flag {
        return Ok(home);
    }
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::data_dir()
        .map(|dir| dir.join("agentos"))
        .context("Cannot determine a data directory; pass --home or set AGENTOS_HOME")
}
