use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".bodega.conf.yml";

/// Credentials for the Bodega leasing service, read from `~/.bodega.conf.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BodegaConfig {
    /// Service URL as written by the Bodega CLI. Accepted but not used:
    /// requests always go to the fixed API host.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: String,
}

impl BodegaConfig {
    /// `$HOME/.bodega.conf.yml`
    pub fn default_path() -> crate::Result<PathBuf> {
        home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("problem reading file {}: {e}", path.display()))
        })?;
        let config: BodegaConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::Error::Config(format!("unable to parse Bodega config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.token.trim().is_empty() {
            return Err(crate::Error::Config("no field named 'token'".into()));
        }
        Ok(())
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Token {}", self.token.trim())
    }
}

/// The current user's home directory, from `$HOME`.
pub fn home_dir() -> crate::Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| crate::Error::Config("HOME is not set".into()))
}
