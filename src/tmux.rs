//! Tmux command vocabulary.
//!
//! [`TmuxCommand`] models the tmux subcommands a launch script uses, and
//! [`Tmux`] renders them as shell lines for one server (program, socket and
//! global flags). Nothing here runs tmux except [`Tmux::global_index`] and
//! [`installed`], which the binary uses before compiling.
//!
//! # Targets
//!
//! Windows and panes are addressed as `session:window.pane`. Tmux allows
//! configuring `base-index` and `pane-base-index`, so the indices stored in a
//! [`Target`] are the real ones, already offset by the caller.

use crate::error::{MuxinateError, Result};
use crate::project::Project;
use crate::shell::{escape, escape_path};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// A `session[:window[.pane]]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub session: String,
    pub window: Option<u32>,
    pub pane: Option<u32>,
}

impl Target {
    pub fn session(session: &str) -> Self {
        Target {
            session: session.to_string(),
            window: None,
            pane: None,
        }
    }

    pub fn window(session: &str, window: u32) -> Self {
        Target {
            window: Some(window),
            ..Target::session(session)
        }
    }

    pub fn pane(session: &str, window: u32, pane: u32) -> Self {
        Target {
            pane: Some(pane),
            ..Target::window(session, window)
        }
    }
}

/// Renders as a shell-safe word.
impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape(&self.session))?;
        if let Some(window) = self.window {
            write!(f, ":{}", window)?;
            if let Some(pane) = self.pane {
                write!(f, ".{}", pane)?;
            }
        }
        Ok(())
    }
}

/// A session target that only matches `session` itself. Without the `=`
/// tmux falls back to prefix matching, so `demo` would find `demo-old`.
fn exact(session: &str) -> String {
    escape(&format!("={}", session))
}

/// Split orientation for `split-window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// New pane to the right (`-h`).
    Horizontal,
    /// New pane below (`-v`).
    Vertical,
}

impl Split {
    pub fn flag(&self) -> &'static str {
        match self {
            Split::Horizontal => "-h",
            Split::Vertical => "-v",
        }
    }
}

/// One tmux invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmuxCommand {
    HasSession {
        session: String,
    },
    /// Creates the session together with its first window.
    NewSession {
        session: String,
        window: Option<String>,
        root: Option<PathBuf>,
    },
    NewWindow {
        target: Target,
        name: Option<String>,
        root: Option<PathBuf>,
    },
    SplitWindow {
        target: Target,
        split: Split,
        root: Option<PathBuf>,
    },
    SelectLayout {
        target: Target,
        layout: String,
    },
    /// Types `keys` into a pane and presses Enter.
    SendKeys {
        target: Target,
        keys: String,
    },
    SetPaneTitle {
        target: Target,
        title: String,
    },
    SynchronizePanes {
        target: Target,
    },
    SelectWindow {
        target: Target,
    },
    SelectPane {
        target: Target,
    },
    AttachSession {
        session: String,
    },
    SwitchClient {
        session: String,
    },
}

impl TmuxCommand {
    /// Whether this command creates a window (the session's first or a later one).
    pub fn creates_window(&self) -> bool {
        matches!(
            self,
            TmuxCommand::NewSession { .. } | TmuxCommand::NewWindow { .. }
        )
    }

    /// Subcommand and arguments, each already quoted for the shell.
    pub fn words(&self) -> Vec<String> {
        fn root_flag(words: &mut Vec<String>, root: &Option<PathBuf>) {
            if let Some(root) = root {
                words.push("-c".into());
                words.push(escape_path(root));
            }
        }

        let mut words: Vec<String> = Vec::new();
        match self {
            TmuxCommand::HasSession { session } => {
                words.extend(["has-session".into(), "-t".into(), exact(session)]);
            }
            TmuxCommand::NewSession {
                session,
                window,
                root,
            } => {
                words.extend(["new-session".into(), "-d".into(), "-s".into(), escape(session)]);
                if let Some(name) = window {
                    words.extend(["-n".into(), escape(name)]);
                }
                root_flag(&mut words, root);
            }
            TmuxCommand::NewWindow { target, name, root } => {
                words.push("new-window".into());
                root_flag(&mut words, root);
                words.extend(["-t".into(), target.to_string()]);
                if let Some(name) = name {
                    words.extend(["-n".into(), escape(name)]);
                }
            }
            TmuxCommand::SplitWindow {
                target,
                split,
                root,
            } => {
                words.push("split-window".into());
                words.push(split.flag().into());
                root_flag(&mut words, root);
                words.extend(["-t".into(), target.to_string()]);
            }
            TmuxCommand::SelectLayout { target, layout } => {
                words.extend([
                    "select-layout".into(),
                    "-t".into(),
                    target.to_string(),
                    escape(layout),
                ]);
            }
            TmuxCommand::SendKeys { target, keys } => {
                words.extend([
                    "send-keys".into(),
                    "-t".into(),
                    target.to_string(),
                    escape(keys),
                    "C-m".into(),
                ]);
            }
            TmuxCommand::SetPaneTitle { target, title } => {
                words.extend([
                    "select-pane".into(),
                    "-t".into(),
                    target.to_string(),
                    "-T".into(),
                    escape(title),
                ]);
            }
            TmuxCommand::SynchronizePanes { target } => {
                words.extend([
                    "set-window-option".into(),
                    "-t".into(),
                    target.to_string(),
                    "synchronize-panes".into(),
                    "on".into(),
                ]);
            }
            TmuxCommand::SelectWindow { target } => {
                words.extend(["select-window".into(), "-t".into(), target.to_string()]);
            }
            TmuxCommand::SelectPane { target } => {
                words.extend(["select-pane".into(), "-t".into(), target.to_string()]);
            }
            TmuxCommand::AttachSession { session } => {
                words.extend(["-u".into(), "attach-session".into(), "-t".into(), exact(session)]);
            }
            TmuxCommand::SwitchClient { session } => {
                words.extend(["-u".into(), "switch-client".into(), "-t".into(), exact(session)]);
            }
        }
        words
    }
}

/// The tmux program plus the global flags every invocation carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tmux {
    program: String,
    flags: Vec<String>,
}

impl Tmux {
    pub fn new(program: &str) -> Self {
        Tmux {
            program: program.to_string(),
            flags: Vec::new(),
        }
    }

    /// Program, `-L socket` and `tmux_options` taken from the project.
    pub fn for_project(project: &Project) -> Self {
        let mut tmux = Tmux::new(&project.tmux_command);
        if let Some(socket) = &project.socket_name {
            tmux.flags.push("-L".into());
            tmux.flags.push(socket.clone());
        }
        tmux.flags.extend(project.tmux_options.iter().cloned());
        tmux
    }

    /// Render one command as a shell line.
    ///
    /// ```
    /// use muxinate::tmux::{Target, Tmux, TmuxCommand};
    ///
    /// let tmux = Tmux::new("tmux");
    /// let line = tmux.render(&TmuxCommand::SendKeys {
    ///     target: Target::pane("demo", 1, 0),
    ///     keys: "npm start".into(),
    /// });
    /// assert_eq!(line, "tmux send-keys -t demo:1.0 'npm start' C-m");
    /// ```
    pub fn render(&self, command: &TmuxCommand) -> String {
        let mut parts = Vec::new();
        // Allow launching from inside another tmux client.
        if matches!(command, TmuxCommand::NewSession { .. }) {
            parts.push("TMUX=".to_string());
        }
        parts.push(escape(&self.program));
        parts.extend(self.flags.iter().map(|f| escape_path(Path::new(f))));
        parts.extend(command.words());
        if matches!(command, TmuxCommand::HasSession { .. }) {
            parts.push("2>/dev/null".into());
        }
        parts.join(" ")
    }
}

/// Check whether `program` can be found on `PATH`.
pub fn installed(program: &str) -> bool {
    which::which(program).is_ok()
}

impl Tmux {
    /// Arguments for reading a numeric global option through this server.
    ///
    /// With `start_server` the query runs as `start-server ; show-options`,
    /// so the server's config file is loaded first. Without it nothing is
    /// started and the query fails when no server is running.
    pub fn query_args(&self, option: &str, start_server: bool, home: Option<&Path>) -> Vec<String> {
        let mut args: Vec<String> = self.flags.iter().map(|f| expand_home(f, home)).collect();
        if start_server {
            args.push("start-server".to_string());
            args.push(";".to_string());
        }
        args.extend(["show-options".to_string(), "-gv".to_string(), option.to_string()]);
        args
    }

    /// Read a numeric global option (`base-index`, `pane-base-index`) from
    /// the project's tmux server, honouring its socket and options.
    ///
    /// # Errors
    ///
    /// [`MuxinateError::TmuxError`] if tmux cannot run or prints something
    /// that is not a number.
    pub fn global_index(&self, option: &str, start_server: bool) -> Result<u32> {
        let args = self.query_args(option, start_server, dirs::home_dir().as_deref());
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| MuxinateError::TmuxError(e.to_string()))?;

        if !output.status.success() {
            return Err(MuxinateError::TmuxError(format!(
                "show-options {} failed",
                option
            )));
        }

        let value = String::from_utf8_lossy(&output.stdout);
        debug!(option, value = %value.trim(), "tmux global option");
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| MuxinateError::TmuxError(format!("failed to parse {}", option)))
    }

    /// Like [`Tmux::global_index`], falling back to 0 when tmux cannot be queried.
    pub fn global_index_or_default(&self, option: &str, start_server: bool) -> u32 {
        self.global_index(option, start_server).unwrap_or_else(|e| {
            warn!(option, error = %e, "using default index");
            0
        })
    }
}

/// Expand a leading `~/` for arguments passed to tmux without a shell.
fn expand_home(arg: &str, home: Option<&Path>) -> String {
    match (arg.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => arg.to_string(),
    }
}
