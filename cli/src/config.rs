use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use mealplan_core::chat::DEFAULT_MODEL;

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_VAR: &str = "MEALPLAN_OPENAI_MODEL";
pub const OPENAI_BASE_URL_VAR: &str = "MEALPLAN_OPENAI_BASE_URL";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub chat: ChatConfig,
}

/// Settings for the completion service. A missing key is not an error until
/// a chat request is made.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            api_key: non_empty(OPENAI_API_KEY_VAR),
            model: non_empty(OPENAI_MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty(OPENAI_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "mealplan").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("mealplan.db");

        Ok(Config {
            db_path,
            data_dir,
            chat: ChatConfig::from_env(),
        })
    }

    /// Load the server API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }
}
