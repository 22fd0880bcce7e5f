use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from voyager.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ViewerConfig {
    pub paths: PathsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Working folder Voyager writes its logs to.
    pub logs_dir: PathBuf,
    /// Where extracts and metrics are written; `<logs_dir>/extracts` if unset.
    pub extracts_dir: Option<PathBuf>,
    pub matchers_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// ANSI colors per category in printed tables.
    pub color: bool,
}

// --- Default implementations ---

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("log"),
            extracts_dir: None,
            matchers_file: PathBuf::from("VoyagerLogViewer.csv"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "invalid config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl ViewerConfig {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(file = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolved extracts folder.
    pub fn extracts_dir(&self) -> PathBuf {
        self.paths
            .extracts_dir
            .clone()
            .unwrap_or_else(|| self.paths.logs_dir.join("extracts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ViewerConfig::parse("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.paths.logs_dir, PathBuf::from("log"));
        assert_eq!(config.extracts_dir(), PathBuf::from("log").join("extracts"));
        assert_eq!(
            config.paths.matchers_file,
            PathBuf::from("VoyagerLogViewer.csv")
        );
        assert!(config.output.color);
    }

    #[test]
    fn extracts_dir_follows_logs_dir() {
        let config = ViewerConfig::parse("[paths]\nlogs_dir = \"/data/voyager\"\n").unwrap();
        assert_eq!(
            config.extracts_dir(),
            PathBuf::from("/data/voyager").join("extracts")
        );
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ViewerConfig::parse(
            r#"
[paths]
logs_dir = "logs"
extracts_dir = "out"
matchers_file = "rules.csv"

[output]
color = false
"#,
        )
        .unwrap();
        assert_eq!(config.extracts_dir(), PathBuf::from("out"));
        assert_eq!(config.paths.matchers_file, PathBuf::from("rules.csv"));
        assert!(!config.output.color);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = ViewerConfig::load(&dir.path().join("voyager.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voyager.toml");
        std::fs::write(&path, "[paths\nlogs_dir = 3").unwrap();
        let err = ViewerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("voyager.toml"));
    }
}
