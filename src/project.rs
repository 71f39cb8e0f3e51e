//! The canonical session description.
//!
//! A [`Project`] is built once by [`normalize`](crate::normalize::normalize)
//! and then only read. Every window holds at least one [`Pane`]; the
//! normalizer inserts the implicit pane so the compiler never has to.

use std::path::{Path, PathBuf};

/// Whether the launched session should take over the terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AttachPolicy {
    /// Attach unless the project says `attach: false` and the session is new.
    #[default]
    Auto,
    /// Always attach (`--attach`).
    ForceAttach,
    /// Never attach (`--no-attach`).
    ForceDetach,
}

impl AttachPolicy {
    /// Map the CLI tri-state onto a policy.
    ///
    /// ```
    /// use muxinate::AttachPolicy;
    ///
    /// assert_eq!(AttachPolicy::from_flag(None), AttachPolicy::Auto);
    /// assert_eq!(AttachPolicy::from_flag(Some(false)), AttachPolicy::ForceDetach);
    /// ```
    pub fn from_flag(attach: Option<bool>) -> Self {
        match attach {
            None => AttachPolicy::Auto,
            Some(true) => AttachPolicy::ForceAttach,
            Some(false) => AttachPolicy::ForceDetach,
        }
    }
}

/// Commands sent into the first pane around window creation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartupHooks {
    /// Sent right after the session is created.
    pub pre: Vec<String>,
    /// Sent after every window and pane is populated.
    pub post: Vec<String>,
}

/// A single terminal split inside a window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Pane {
    /// Optional pane title (`select-pane -T`).
    pub title: Option<String>,
    /// Commands typed into the pane, in order.
    pub commands: Vec<String>,
}

/// A tmux window and its panes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub name: Option<String>,
    /// Overrides the project root for this window.
    pub root: Option<PathBuf>,
    /// A tmux layout name (`main-vertical`, `tiled`, ...) or a custom layout string.
    pub layout: Option<String>,
    /// Commands typed into every pane of this window before the pane's own.
    pub pre: Vec<String>,
    /// Never empty once normalized.
    pub panes: Vec<Pane>,
    /// Toggle `synchronize-panes` once the window is populated.
    pub synchronized: bool,
}

impl Window {
    /// A window with a single empty pane.
    pub fn new(name: Option<String>) -> Self {
        Window {
            name,
            root: None,
            layout: None,
            pre: Vec::new(),
            panes: vec![Pane::default()],
            synchronized: false,
        }
    }
}

/// A fully resolved session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Logical project name as declared (or the file stem).
    pub name: String,
    /// Session name used in every tmux target.
    pub session_name: String,
    pub root: Option<PathBuf>,
    /// Alternate tmux server socket (`tmux -L`).
    pub socket_name: Option<String>,
    /// Program invoked for every command, normally `tmux`.
    pub tmux_command: String,
    /// Extra global flags placed before each subcommand.
    pub tmux_options: Vec<String>,
    pub hooks: StartupHooks,
    /// Commands typed into every pane of every window before anything else.
    pub pre_window: Vec<String>,
    pub windows: Vec<Window>,
    pub attach_policy: AttachPolicy,
    /// The project's own `attach` key, consulted only under [`AttachPolicy::Auto`].
    pub attach_by_default: bool,
    pub base_index: u32,
    pub pane_base_index: u32,
    /// Warnings about obsolete keys found while normalizing.
    pub deprecations: Vec<String>,
}

impl Project {
    /// Working directory for a window: the window's own root, else the project's.
    pub fn window_root<'a>(&'a self, window: &'a Window) -> Option<&'a Path> {
        window.root.as_deref().or(self.root.as_deref())
    }

    /// Whether a freshly created session should be attached.
    pub fn attach_when_created(&self) -> bool {
        match self.attach_policy {
            AttachPolicy::Auto => self.attach_by_default,
            AttachPolicy::ForceAttach => true,
            AttachPolicy::ForceDetach => false,
        }
    }

    /// Whether an already running session should be attached.
    pub fn attach_when_existing(&self) -> bool {
        self.attach_policy != AttachPolicy::ForceDetach
    }

    pub fn deprecations(&self) -> &[String] {
        &self.deprecations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(policy: AttachPolicy, by_default: bool) -> Project {
        Project {
            name: "demo".into(),
            session_name: "demo".into(),
            root: Some(PathBuf::from("~/demo")),
            socket_name: None,
            tmux_command: "tmux".into(),
            tmux_options: Vec::new(),
            hooks: StartupHooks::default(),
            pre_window: Vec::new(),
            windows: vec![Window::new(None)],
            attach_policy: policy,
            attach_by_default: by_default,
            base_index: 0,
            pane_base_index: 0,
            deprecations: Vec::new(),
        }
    }

    #[test]
    fn test_window_root_cascade() {
        let p = project(AttachPolicy::Auto, true);
        let mut w = Window::new(Some("logs".into()));
        assert_eq!(p.window_root(&w), Some(Path::new("~/demo")));
        w.root = Some(PathBuf::from("/var/log"));
        assert_eq!(p.window_root(&w), Some(Path::new("/var/log")));
    }

    #[test]
    fn test_attach_decisions() {
        let auto_off = project(AttachPolicy::Auto, false);
        assert!(!auto_off.attach_when_created());
        assert!(auto_off.attach_when_existing());

        let detach = project(AttachPolicy::ForceDetach, true);
        assert!(!detach.attach_when_created());
        assert!(!detach.attach_when_existing());

        let attach = project(AttachPolicy::ForceAttach, false);
        assert!(attach.attach_when_created());
        assert!(attach.attach_when_existing());
    }

    #[test]
    fn test_new_window_has_one_pane() {
        assert_eq!(Window::new(None).panes, vec![Pane::default()]);
    }
}
