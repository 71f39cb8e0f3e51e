//! # Muxinate
//!
//! Describe a tmux session in a project file and launch it with one command.
//!
//! A project file lists windows, their panes and the commands each pane
//! runs. Muxinate compiles it into a shell script of tmux invocations that
//! creates the session, or reattaches when the session already exists.
//!
//! ## Quick Example
//!
//! ```yaml
//! # ~/.config/muxinate/blog.yml
//! name: blog
//! root: ~/src/blog
//! windows:
//!   - editor: vim
//!   - server:
//!       layout: main-vertical
//!       panes:
//!         - bundle exec rails s
//!         - tail -f log/development.log
//! ```
//!
//! ```
//! use muxinate::normalize::{normalize, NormalizeOptions};
//!
//! let raw: serde_yaml::Value = serde_yaml::from_str("name: blog\nwindows:\n  - editor: vim\n").unwrap();
//! let project = normalize(&raw, &NormalizeOptions::default()).unwrap();
//! let script = muxinate::compile(&project).unwrap();
//! assert!(script.contains("tmux send-keys -t blog:0.0 vim C-m"));
//! ```
//!
//! ## Architecture
//!
//! The crate is organized into these modules:
//!
//! - [`normalize`]: raw project data to [`Project`], including deprecated keys
//! - [`project`]: the canonical session model
//! - [`compiler`]: [`Project`] to tmux command plan and script
//! - [`tmux`]: tmux command vocabulary and boundary queries
//! - [`shell`]: shell quoting
//! - [`loader`]: project file discovery and parsing
//! - [`interpolate`]: `{key}` settings substitution
//! - [`launch`]: printing or exec'ing a compiled project
//! - [`cli`]: command-line argument parsing with clap
//! - [`error`]: error types

pub mod cli;
pub mod compiler;
pub mod error;
pub mod interpolate;
pub mod launch;
pub mod loader;
pub mod normalize;
pub mod project;
pub mod shell;
pub mod tmux;

pub use compiler::{Plan, compile, plan};
pub use error::{CompileError, MuxinateError, Result, ValidationError};
pub use normalize::{NormalizeOptions, normalize};
pub use project::{AttachPolicy, Pane, Project, StartupHooks, Window};
