//! Project file discovery and loading.
//!
//! Each project lives in its own file inside the project directory. The
//! directory is chosen in this order:
//!
//! 1. `$MUXINATE_CONFIG`
//! 2. `$XDG_CONFIG_HOME/muxinate`
//! 3. `~/.config/muxinate`
//!
//! Project files are YAML (`.yml`, `.yaml`) or TOML (`.toml`). Both are read
//! into the same raw mapping for [`normalize`](crate::normalize::normalize).

use crate::error::{MuxinateError, Result};
use crate::interpolate::interpolate;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides the project directory.
pub const CONFIG_ENV: &str = "MUXINATE_CONFIG";

/// Extensions recognised as project files, in lookup order.
pub const EXTENSIONS: &[&str] = &["yml", "yaml", "toml"];

/// Stem of the user's own template for `new`.
const DEFAULT_TEMPLATE: &str = "default";

/// Template used by `new` when the user has no `default.yml`.
pub const SAMPLE_TEMPLATE: &str = include_str!("../assets/sample.yml");

/// Determine the project directory.
///
/// # Errors
///
/// Returns [`MuxinateError::NoConfigDir`] if the home directory cannot be determined.
pub fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("muxinate"));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join("muxinate"))
        .ok_or(MuxinateError::NoConfigDir)
}

/// The directory holding project files.
#[derive(Debug, Clone)]
pub struct ProjectDir {
    root: PathBuf,
}

impl ProjectDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectDir { root: root.into() }
    }

    /// Open the directory from [`default_config_dir`].
    pub fn locate() -> Result<Self> {
        Ok(ProjectDir::new(default_config_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the project's file. The first existing extension wins; a
    /// project that does not exist yet resolves to `<name>.yml`.
    pub fn project_path(&self, name: &str) -> PathBuf {
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
            .unwrap_or_else(|| self.root.join(format!("{}.yml", name)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.project_path(name).is_file()
    }

    /// Names of all projects, sorted alphabetically.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_project = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if !is_project || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if stem != DEFAULT_TEMPLATE {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// The user's own template for `new`, if present.
    pub fn default_template(&self) -> Option<PathBuf> {
        Some(self.project_path(DEFAULT_TEMPLATE)).filter(|p| p.is_file())
    }

    /// Ensure the directory exists, creating it if necessary.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// Load a project file, substituting `{key}` settings before parsing.
///
/// # Errors
///
/// - [`MuxinateError::ProjectNotFound`] if the file doesn't exist
/// - [`MuxinateError::IoError`] if reading fails
/// - [`MuxinateError::YamlError`] / [`MuxinateError::TomlError`] if parsing fails
pub fn load_project(path: &Path, settings: &HashMap<String, String>) -> Result<Value> {
    if !path.is_file() {
        return Err(MuxinateError::ProjectNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let contents = interpolate(&contents, settings);
    debug!(path = %path.display(), "loaded project file");
    parse_project(path, &contents)
}

/// Parse project text according to the file's extension.
pub fn parse_project(path: &Path, contents: &str) -> Result<Value> {
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    if is_toml {
        let table: toml::Value =
            toml::from_str(contents).map_err(|source| MuxinateError::TomlError {
                path: path.to_path_buf(),
                source,
            })?;
        serde_yaml::to_value(table).map_err(|source| MuxinateError::YamlError {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(contents).map_err(|source| MuxinateError::YamlError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Text for a new project: the user's `default` template, else the sample.
pub fn new_project_text(dir: &ProjectDir, name: &str) -> Result<String> {
    let template = match dir.default_template() {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_TEMPLATE.to_string(),
    };
    let settings = HashMap::from([("name".to_string(), name.to_string())]);
    Ok(interpolate(&template, &settings))
}
