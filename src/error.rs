//! Error types for muxinate.
//!
//! [`MuxinateError`] is the top-level error returned to the binary. The two
//! core stages have their own types: [`ValidationError`] for project files
//! that cannot be turned into a [`Project`](crate::project::Project), and
//! [`CompileError`] for projects that break an invariant the normalizer
//! should have enforced.

use std::path::PathBuf;
use thiserror::Error;

/// All possible errors that can occur in muxinate.
#[derive(Error, Debug)]
pub enum MuxinateError {
    /// Project file does not exist at the expected path.
    #[error("Project file not found: {0}")]
    ProjectNotFound(PathBuf),

    /// Could not determine the directory holding project files.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing failed.
    #[error("Failed to parse {path}: {source}")]
    YamlError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// TOML parsing failed.
    #[error("Failed to parse {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The project file parsed but does not describe a usable session.
    #[error("Invalid project {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    /// The project could not be validated (no file context available).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The compiler found a broken invariant.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A `KEY=VALUE` setting was malformed.
    #[error("Invalid setting (expected KEY=VALUE): {0}")]
    InvalidSetting(String),

    /// A tmux query failed to execute.
    #[error("Tmux error: {0}")]
    TmuxError(String),

    /// An interactive prompt failed.
    #[error("Prompt failed: {0}")]
    PromptError(#[from] dialoguer::Error),

    /// A required environment variable is not set.
    #[error("${0} is not set")]
    MissingEnv(&'static str),
}

/// A project description that cannot be normalized.
///
/// Every variant names the field at fault so the user can fix the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The top level of the file is not a mapping.
    #[error("project must be a mapping of keys to values")]
    NotAMapping,

    /// Neither a `name` key, a custom name, nor a file stem was available.
    #[error("`name` is missing and no session name could be derived")]
    MissingName,

    /// The project declares no windows.
    #[error("`windows` must list at least one window")]
    NoWindows,

    /// A field holds a value of the wrong shape.
    #[error("`{field}` is invalid: expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

impl ValidationError {
    pub(crate) fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            expected,
        }
    }
}

/// A [`Project`](crate::project::Project) that violates a compiler invariant.
///
/// These indicate a normalizer defect, never user error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("session name is empty")]
    EmptySessionName,

    #[error("project has no windows")]
    NoWindows,

    #[error("window {0} has no panes")]
    NoPanes(usize),

    #[error("window or pane index exceeds the tmux index range")]
    IndexOutOfRange,
}

/// Convenient Result type alias for muxinate operations.
pub type Result<T> = std::result::Result<T, MuxinateError>;
