//! Command-line interface for muxinate.
//!
//! Parses arguments using clap and provides the [`Cli`] struct and its
//! [`Commands`].

use clap::{Args, Parser, Subcommand};

/// Every subcommand with its one-line description, for `commands` and
/// shell completion.
pub const COMMANDS: &[(&str, &str)] = &[
    ("commands", "Lists commands available in muxinate"),
    ("completions", "Used for shell completion"),
    ("new", "Create a new project file and open it in your editor"),
    ("open", "Alias of new"),
    (
        "start",
        "Start a tmux session using a project's config, with an optional [ALIAS] for project reuse",
    ),
    ("debug", "Output the shell commands that are generated by muxinate"),
    ("copy", "Copy an existing project to a new project and open it in your editor"),
    ("delete", "Deletes given project"),
    ("implode", "Deletes all muxinate projects"),
    ("version", "Display installed muxinate version"),
    ("doctor", "Look for problems in your configuration"),
    ("list", "Lists all muxinate projects"),
];

/// Subcommands whose argument is a project name.
pub const PROJECT_COMMANDS: &[&str] = &["start", "open", "copy", "delete"];

/// Command-line arguments for muxinate.
///
/// # Examples
///
/// ```bash
/// # Launch (or reattach to) the "blog" project
/// muxinate start blog
///
/// # Launch a second copy of it under another session name
/// muxinate start blog blog-review
///
/// # Print the generated script instead of running it
/// muxinate debug blog branch=main
/// ```
#[derive(Parser, Debug)]
#[command(name = "muxinate")]
#[command(version)]
#[command(about = "Create and manage tmux sessions from project files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lists commands available in muxinate.
    Commands {
        /// Print descriptions in zsh completion format.
        shell: Option<String>,
    },

    /// Used for shell completion.
    Completions { arg: String },

    /// Create a new project file and open it in your editor.
    #[command(visible_aliases = ["open", "edit", "o", "e", "n"])]
    New { project: String },

    /// Start a tmux session using a project's config.
    #[command(visible_alias = "s")]
    Start(LaunchArgs),

    /// Output the shell commands that are generated by muxinate.
    Debug(LaunchArgs),

    /// Copy an existing project to a new project and open it in your editor.
    #[command(visible_aliases = ["c", "cp"])]
    Copy { existing: String, new: String },

    /// Deletes given project.
    #[command(visible_aliases = ["d", "rm"])]
    Delete { project: String },

    /// Deletes all muxinate projects.
    #[command(visible_alias = "i")]
    Implode,

    /// Lists all muxinate projects.
    #[command(visible_aliases = ["l", "ls"])]
    List,

    /// Display installed muxinate version.
    Version,

    /// Look for problems in your configuration.
    Doctor,
}

/// Arguments shared by `start` and `debug`.
#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Project to launch.
    pub project: String,

    /// Session name to use instead of the project's own.
    pub session_name: Option<String>,

    /// `KEY=VALUE` settings substituted for `{KEY}` in the project file.
    #[arg(value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Attach to tmux session after creation.
    #[arg(short, long, overrides_with = "no_attach")]
    pub attach: bool,

    /// Leave the session running in the background.
    #[arg(long, overrides_with = "attach")]
    pub no_attach: bool,
}

impl LaunchArgs {
    /// The attach tri-state.
    ///
    /// Returns `None` when neither flag was given, so the project decides.
    pub fn attach(&self) -> Option<bool> {
        if self.attach {
            Some(true)
        } else if self.no_attach {
            Some(false)
        } else {
            None
        }
    }

    /// Split the positional arguments. A `KEY=VALUE` in the session name
    /// position is a setting, not a name.
    pub fn split(&self) -> (Option<String>, Vec<String>) {
        let mut settings = self.settings.clone();
        match &self.session_name {
            Some(name) if name.contains('=') => {
                settings.insert(0, name.clone());
                (None, settings)
            }
            other => (other.clone(), settings),
        }
    }
}

/// Text printed by `commands`.
pub fn commands_text(shell: Option<&str>) -> String {
    if shell == Some("zsh") {
        COMMANDS
            .iter()
            .map(|(name, desc)| format!("{}:{}", name, desc))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        COMMANDS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
