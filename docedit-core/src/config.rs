//! Configuration management for docedit

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ingest::WELCOME_DOCUMENT;
use crate::outline::MalformedTagPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub outline: OutlineConfig,
    pub document: DocumentConfig,
    #[cfg(feature = "watch")]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Spaces per indentation step in the rendered outline
    pub indent_width: usize,
    pub on_malformed_tag: MalformedTagPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Markdown seeded into a document opened without a file
    pub initial_content: Option<String>,
    /// Fall back to the built-in welcome document when `initial_content` is unset
    pub welcome: bool,
}

#[cfg(feature = "watch")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            on_malformed_tag: MalformedTagPolicy::Fail,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            initial_content: None,
            welcome: true,
        }
    }
}

#[cfg(feature = "watch")]
impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 250,
        }
    }
}

impl DocumentConfig {
    /// Source to seed a file-less document with, `None` for an empty document
    pub fn initial_source(&self) -> Option<&str> {
        match self.initial_content.as_deref() {
            Some(content) => Some(content),
            None => self.welcome.then_some(WELCOME_DOCUMENT),
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docedit")
            .map(|proj_dirs| proj_dirs.config_dir().join("docedit.toml"))
    }

    /// Load configuration from the platform path, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        ensure_not_world_writable(path)?;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(unix)]
fn ensure_not_world_writable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
    if metadata.permissions().mode() & 0o002 != 0 {
        anyhow::bail!(
            "Config file {} is world-writable (insecure permissions)",
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_not_world_writable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::HeadingLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.outline.indent_width, 2);
        assert_eq!(config.outline.on_malformed_tag, MalformedTagPolicy::Fail);
        assert!(config.document.welcome);
        assert_eq!(config.document.initial_source(), Some(WELCOME_DOCUMENT));
    }

    #[test]
    fn test_initial_source_resolution() {
        let mut document = DocumentConfig {
            initial_content: Some("# Mine".to_string()),
            welcome: true,
        };
        assert_eq!(document.initial_source(), Some("# Mine"));

        document.initial_content = None;
        document.welcome = false;
        assert_eq!(document.initial_source(), None);
    }

    #[test]
    fn test_load_valid_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        let mut toml_content = String::from(
            "[outline]\n\
indent_width = 4\n\
on_malformed_tag = \"skip\"\n\
\n\
[document]\n\
initial_content = \"# Hello\"\n\
welcome = false\n",
        );

        if cfg!(feature = "watch") {
            toml_content.push_str("\n[watch]\nenabled = false\ndebounce_ms = 500\n");
        }

        file.write_all(toml_content.as_bytes())?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.outline.indent_width, 4);
        assert_eq!(config.outline.on_malformed_tag, MalformedTagPolicy::Skip);
        assert_eq!(config.document.initial_source(), Some("# Hello"));

        #[cfg(feature = "watch")]
        {
            assert!(!config.watch.enabled);
            assert_eq!(config.watch.debounce_ms, 500);
        }

        Ok(())
    }

    #[test]
    fn test_load_partial_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[outline]\non_malformed_tag = { default_level = 2 }\n")?;

        let config = Config::load_from(file.path())?;
        assert_eq!(
            config.outline.on_malformed_tag,
            MalformedTagPolicy::DefaultLevel(HeadingLevel::H2)
        );
        assert_eq!(config.outline.indent_width, 2);
        assert!(config.document.welcome);

        Ok(())
    }

    #[test]
    fn test_out_of_range_level_is_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[outline]\non_malformed_tag = { default_level = 9 }\n")?;

        assert!(Config::load_from(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"invalid toml [[[syntax").unwrap();

        let result = Config::load_from(file.path());
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_world_writable_config_is_rejected() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let file = NamedTempFile::new()?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666))?;

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-writable"));
        Ok(())
    }

    #[test]
    fn test_config_path_returns_some() {
        let path = Config::config_path();
        assert!(path.is_some());
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("docedit"));
            assert!(p.to_string_lossy().ends_with("docedit.toml"));
        }
    }

    #[test]
    fn test_config_round_trip() -> Result<()> {
        let mut config = Config::default();
        config.outline.on_malformed_tag = MalformedTagPolicy::DefaultLevel(HeadingLevel::H3);

        let toml_str = toml::to_string(&config)?;
        let parsed: Config = toml::from_str(&toml_str)?;
        assert_eq!(parsed.outline.on_malformed_tag, config.outline.on_malformed_tag);

        Ok(())
    }
}
