use std::{fs, path::Path, path::PathBuf, time::Duration};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{NovaError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Model identifiers, one per purpose class
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ModelRoster {
    /// Lightweight text tasks: summaries, titles, action items
    pub text: String,
    /// Cover image generation
    pub image: String,
    /// Search-grounded answers
    pub search: String,
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            text: "gemini-3-flash-preview".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
            search: "gemini-3-pro-preview".to_string(),
        }
    }
}

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Key for the model service. Environment variables take precedence.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the model service, without trailing `/models`
    pub api_base_url: String,

    /// Models used per request purpose
    pub models: ModelRoster,

    /// Aspect ratio requested for cover images
    pub cover_aspect_ratio: String,

    /// Per-request timeout in seconds. No timeout when unset.
    pub request_timeout_secs: Option<u64>,

    /// Default editor command
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            models: ModelRoster::default(),
            cover_aspect_ratio: "16:9".to_string(),
            request_timeout_secs: None,
            editor_command: None,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the per-user config file.
    ///
    /// A missing file yields the defaults. The API key is then taken from the
    /// environment when set there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        if let Some(key) = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        {
            config.api_key = Some(key);
        }

        Ok(config)
    }

    /// Reads a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| NovaError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// `<config dir>/config.json` for the current user
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "novanode").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// The API key, or a configuration error naming where to set it
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| NovaError::ConfigError {
                message: format!(
                    "no API key configured; set {} or api_key in the config file",
                    API_KEY_VARS[0]
                ),
            })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -t".to_string()
        } else {
            // Try common Linux editors
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_three_model_classes() {
        let config = Config::default();
        assert_eq!(config.models.text, "gemini-3-flash-preview");
        assert_eq!(config.models.image, "gemini-2.5-flash-image");
        assert_eq!(config.models.search, "gemini-3-pro-preview");
        assert_eq!(config.cover_aspect_ratio, "16:9");
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "models": {{ "search": "custom-search" }}, "request_timeout_secs": 30 }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.models.search, "custom-search");
        assert_eq!(config.models.text, "gemini-3-flash-preview");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(NovaError::ConfigError { .. })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn api_key_is_required_when_missing() {
        let config = Config {
            api_key: None,
            ..Config::default()
        };
        assert!(config.require_api_key().is_err());

        let config = Config {
            api_key: Some("k".into()),
            ..Config::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "k");
    }

    #[test]
    fn configured_editor_wins() {
        let config = Config {
            editor_command: Some("code --wait".into()),
            ..Config::default()
        };
        assert_eq!(config.get_editor_command(), "code --wait");
    }
}
