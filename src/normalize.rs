//! Schema normalization.
//!
//! Turns the raw mapping read from a project file into a [`Project`]. Old
//! project files keep working: every key listed in [`DEPRECATED_KEYS`] is
//! migrated onto its current counterpart and a warning is recorded on the
//! project instead of failing.
//!
//! # Project Format
//!
//! ```yaml
//! name: demo
//! root: ~/src/demo
//! pre_hooks: docker compose up -d
//! windows:
//!   - editor: vim
//!   - server:
//!       layout: main-vertical
//!       panes:
//!         - npm start
//!         - logs: tail -f log/development.log
//! ```
//!
//! Window bodies may be null, a command, a list of commands (one pane) or a
//! mapping with `root`, `layout`, `synchronize`, `pre` and `panes`.

use crate::error::ValidationError;
use crate::project::{AttachPolicy, Pane, Project, StartupHooks, Window};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;
use tracing::debug;

type Result<T> = std::result::Result<T, ValidationError>;

/// Command field that accepts either a single string or array of strings.
///
/// ```yaml
/// pre_hooks: single command
/// # or
/// pre_hooks: [command 1, command 2]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Cmd {
    /// A single command string.
    Single(String),
    /// Multiple commands executed in sequence.
    Multiple(Vec<String>),
}

impl Cmd {
    /// Convert to a `Vec<String>`, normalizing both variants.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Cmd::Single(s) => vec![s.clone()],
            Cmd::Multiple(v) => v.clone(),
        }
    }
}

/// Runtime options supplied by the caller rather than the project file.
#[derive(Debug, Default, Clone)]
pub struct NormalizeOptions {
    /// `Some(true)` forces attach, `Some(false)` forces detach.
    pub attach: Option<bool>,
    /// Session name given on the command line.
    pub custom_name: Option<String>,
    /// Stem of the project file, used when the file declares no name.
    pub file_stem: Option<String>,
    /// tmux's global `base-index`, unless the project sets `base_index`.
    pub base_index: u32,
    /// tmux's global `pane-base-index`, unless the project sets `pane_base_index`.
    pub pane_base_index: u32,
}

/// An obsolete top-level key and how it maps onto the current vocabulary.
pub struct DeprecatedKey {
    pub key: &'static str,
    pub canonical: &'static str,
    pub migrate: fn(&Value) -> Value,
    pub message: &'static str,
}

fn same(value: &Value) -> Value {
    value.clone()
}

fn rbenv(value: &Value) -> Value {
    Value::String(format!("rbenv shell {}", scalar(value).unwrap_or_default()))
}

fn rvm(value: &Value) -> Value {
    Value::String(format!("rvm use {}", scalar(value).unwrap_or_default()))
}

/// Obsolete keys in lookup order.
///
/// Only the first row found for a canonical key is migrated; later rows for
/// the same key are still reported but their value is dropped. So with both
/// `rbenv` and `rvm` set, `pre_window` becomes `rbenv shell <v>`, and a
/// current key always beats every alias.
pub const DEPRECATED_KEYS: &[DeprecatedKey] = &[
    DeprecatedKey {
        key: "project_name",
        canonical: "name",
        migrate: same,
        message: "DEPRECATION: The `project_name` option has been replaced by the `name` option.",
    },
    DeprecatedKey {
        key: "project_root",
        canonical: "root",
        migrate: same,
        message: "DEPRECATION: The `project_root` option has been replaced by the `root` option.",
    },
    DeprecatedKey {
        key: "tabs",
        canonical: "windows",
        migrate: same,
        message: "DEPRECATION: The `tabs` option has been replaced by the `windows` option.",
    },
    DeprecatedKey {
        key: "pre",
        canonical: "pre_hooks",
        migrate: same,
        message: "DEPRECATION: The `pre` option has been replaced by the `pre_hooks` list.",
    },
    DeprecatedKey {
        key: "post",
        canonical: "post_hooks",
        migrate: same,
        message: "DEPRECATION: The `post` option has been replaced by the `post_hooks` list.",
    },
    DeprecatedKey {
        key: "pre_tab",
        canonical: "pre_window",
        migrate: same,
        message: "DEPRECATION: The `pre_tab` option has been replaced by the `pre_window` option.",
    },
    DeprecatedKey {
        key: "rbenv",
        canonical: "pre_window",
        migrate: rbenv,
        message: "DEPRECATION: The `rbenv` option has been replaced by the `pre_window` option.",
    },
    DeprecatedKey {
        key: "rvm",
        canonical: "pre_window",
        migrate: rvm,
        message: "DEPRECATION: The `rvm` option has been replaced by the `pre_window` option.",
    },
    DeprecatedKey {
        key: "cli_args",
        canonical: "tmux_options",
        migrate: same,
        message: "DEPRECATION: The `cli_args` option has been replaced by the `tmux_options` option.",
    },
];

/// Build a [`Project`] from a parsed project file.
///
/// Deprecated keys never fail; their warnings end up in
/// [`Project::deprecations`].
///
/// # Errors
///
/// - [`ValidationError::NotAMapping`] if `raw` is not a mapping
/// - [`ValidationError::NoWindows`] if no window is declared
/// - [`ValidationError::MissingName`] if no session name can be derived
/// - [`ValidationError::InvalidField`] for a value of the wrong shape
pub fn normalize(raw: &Value, options: &NormalizeOptions) -> Result<Project> {
    let original = raw.as_mapping().ok_or(ValidationError::NotAMapping)?;
    let (map, deprecations) = migrate(original);

    let declared = string_field(&map, "name")?.filter(|n| !n.trim().is_empty());
    let name = declared
        .or_else(|| options.file_stem.clone())
        .ok_or(ValidationError::MissingName)?;
    let session_name = session_name(options.custom_name.as_deref().unwrap_or(&name));
    if session_name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    let windows = windows(map.get("windows"))?;

    let tmux_options = match cmd_field(&map, "tmux_options")? {
        Some(Cmd::Single(s)) => s.split_whitespace().map(String::from).collect(),
        Some(Cmd::Multiple(v)) => v,
        None => Vec::new(),
    };

    let project = Project {
        name,
        session_name,
        root: string_field(&map, "root")?.map(PathBuf::from),
        socket_name: string_field(&map, "socket_name")?,
        tmux_command: string_field(&map, "tmux_command")?
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "tmux".to_string()),
        tmux_options,
        hooks: StartupHooks {
            pre: commands_field(&map, "pre_hooks")?,
            post: commands_field(&map, "post_hooks")?,
        },
        pre_window: commands_field(&map, "pre_window")?,
        windows,
        attach_policy: AttachPolicy::from_flag(options.attach),
        attach_by_default: bool_field(&map, "attach")?.unwrap_or(true),
        base_index: index_field(&map, "base_index")?.unwrap_or(options.base_index),
        pane_base_index: index_field(&map, "pane_base_index")?
            .unwrap_or(options.pane_base_index),
        deprecations,
    };

    debug!(
        session = %project.session_name,
        windows = project.windows.len(),
        deprecations = project.deprecations.len(),
        "normalized project"
    );
    Ok(project)
}

/// Copy current keys and fold deprecated ones onto them.
fn migrate(original: &Mapping) -> (Mapping, Vec<String>) {
    let mut map = original.clone();
    let mut deprecations = Vec::new();

    for entry in DEPRECATED_KEYS {
        let Some(value) = original.get(entry.key) else {
            continue;
        };
        debug!(key = entry.key, canonical = entry.canonical, "deprecated key");
        deprecations.push(entry.message.to_string());
        map.remove(entry.key);

        let canonical = Value::String(entry.canonical.to_string());
        if !map.contains_key(&canonical) {
            map.insert(canonical, (entry.migrate)(value));
        }
    }

    (map, deprecations)
}

/// tmux treats `.` and `:` as target separators, so they cannot appear in
/// session names.
///
/// ```
/// use muxinate::normalize::session_name;
///
/// assert_eq!(session_name("api.v2:dev"), "api_v2_dev");
/// ```
pub fn session_name(raw: &str) -> String {
    raw.trim().replace(['.', ':'], "_")
}

fn windows(value: Option<&Value>) -> Result<Vec<Window>> {
    let entries = match value {
        None | Some(Value::Null) => return Err(ValidationError::NoWindows),
        Some(Value::Sequence(entries)) => entries,
        Some(_) => return Err(ValidationError::invalid("windows", "a list of windows")),
    };
    if entries.is_empty() {
        return Err(ValidationError::NoWindows);
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| window(entry, &format!("windows[{}]", i)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct WindowDef {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    layout: Option<String>,
    #[serde(default)]
    synchronize: bool,
    #[serde(default)]
    pre: Option<Cmd>,
    #[serde(default)]
    panes: Option<Vec<Value>>,
}

fn window(entry: &Value, field: &str) -> Result<Window> {
    let (key, body) = single_entry(entry)
        .ok_or_else(|| ValidationError::invalid(field, "a mapping of window name to definition"))?;
    let name = scalar(key);
    let mut window = Window::new(name.clone());
    let field = match &name {
        Some(n) => format!("{}.{}", field, n),
        None => field.to_string(),
    };

    match body {
        Value::Null => {}
        Value::String(cmd) => window.panes = vec![pane_with(vec![cmd.clone()])],
        Value::Sequence(_) => window.panes = vec![pane_with(command_list(body, &field)?)],
        Value::Mapping(_) => {
            let def: WindowDef = serde_yaml::from_value(body.clone()).map_err(|_| {
                ValidationError::invalid(
                    field.as_str(),
                    "a window definition (root, layout, synchronize, pre, panes)",
                )
            })?;
            window.root = def.root.map(PathBuf::from);
            window.layout = def.layout;
            window.synchronized = def.synchronize;
            window.pre = def.pre.map(|c| c.to_vec()).unwrap_or_default();
            if let Some(panes) = def.panes {
                let panes = panes
                    .iter()
                    .enumerate()
                    .map(|(i, p)| pane(p, &format!("{}.panes[{}]", field, i)))
                    .collect::<Result<Vec<_>>>()?;
                if !panes.is_empty() {
                    window.panes = panes;
                }
            }
        }
        other => {
            let cmd = scalar(other).ok_or_else(|| {
                ValidationError::invalid(
                    field.as_str(),
                    "a command, a list of commands or a window definition",
                )
            })?;
            window.panes = vec![pane_with(vec![cmd])];
        }
    }

    Ok(window)
}

fn pane(entry: &Value, field: &str) -> Result<Pane> {
    match entry {
        Value::Null => Ok(Pane::default()),
        Value::Sequence(_) => Ok(pane_with(command_list(entry, field)?)),
        Value::Mapping(_) => {
            let (key, body) = single_entry(entry)
                .ok_or_else(|| ValidationError::invalid(field, "a mapping of pane title to commands"))?;
            let commands = match body {
                Value::Null => Vec::new(),
                Value::Sequence(_) => command_list(body, field)?,
                other => vec![scalar(other).ok_or_else(|| {
                    ValidationError::invalid(field, "a command or a list of commands")
                })?],
            };
            Ok(Pane {
                title: scalar(key),
                commands,
            })
        }
        other => scalar(other)
            .map(|cmd| pane_with(vec![cmd]))
            .ok_or_else(|| ValidationError::invalid(field, "a command or a list of commands")),
    }
}

fn pane_with(commands: Vec<String>) -> Pane {
    Pane {
        title: None,
        commands,
    }
}

fn single_entry(value: &Value) -> Option<(&Value, &Value)> {
    let map = value.as_mapping()?;
    if map.len() != 1 {
        return None;
    }
    map.iter().next()
}

fn command_list(value: &Value, field: &str) -> Result<Vec<String>> {
    let Value::Sequence(items) = value else {
        return Err(ValidationError::invalid(field, "a list of commands"));
    };
    items
        .iter()
        .map(|item| {
            scalar(item).ok_or_else(|| ValidationError::invalid(field, "a list of commands"))
        })
        .collect()
}

/// Render a scalar as text. Null and collections yield `None`.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(map: &Mapping, key: &'static str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar(value)
            .map(Some)
            .ok_or_else(|| ValidationError::invalid(key, "a string")),
    }
}

fn cmd_field(map: &Mapping, key: &'static str) -> Result<Option<Cmd>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(list @ Value::Sequence(_)) => Ok(Some(Cmd::Multiple(command_list(list, key)?))),
        Some(value) => scalar(value)
            .map(|s| Some(Cmd::Single(s)))
            .ok_or_else(|| ValidationError::invalid(key, "a string or a list of strings")),
    }
}

fn commands_field(map: &Mapping, key: &'static str) -> Result<Vec<String>> {
    Ok(cmd_field(map, key)?.map(|c| c.to_vec()).unwrap_or_default())
}

fn bool_field(map: &Mapping, key: &'static str) -> Result<Option<bool>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ValidationError::invalid(key, "true or false")),
    }
}

/// Largest `base_index`/`pane_base_index` accepted, leaving room for every
/// window and pane index after it.
const MAX_INDEX: u64 = i32::MAX as u64;

fn index_field(map: &Mapping, key: &'static str) -> Result<Option<u32>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|n| *n <= MAX_INDEX)
            .map(|n| Some(n as u32))
            .ok_or_else(|| ValidationError::invalid(key, "an integer from 0 to 2147483647")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    fn opts() -> NormalizeOptions {
        NormalizeOptions::default()
    }

    #[test]
    fn test_demo_project() {
        let raw = yaml(
            r#"
name: demo
windows:
  - editor:
      panes:
        - vim
  - server:
      panes:
        -
        - npm start
"#,
        );
        let project = normalize(&raw, &opts()).unwrap();
        assert_eq!(project.session_name, "demo");
        assert_eq!(project.tmux_command, "tmux");
        assert_eq!(project.windows.len(), 2);
        assert_eq!(project.windows[0].name.as_deref(), Some("editor"));
        assert_eq!(project.windows[0].panes[0].commands, vec!["vim"]);
        assert_eq!(project.windows[1].panes.len(), 2);
        assert!(project.windows[1].panes[0].commands.is_empty());
        assert_eq!(project.windows[1].panes[1].commands, vec!["npm start"]);
        assert!(project.deprecations.is_empty());
    }

    #[test]
    fn test_window_body_forms() {
        let raw = yaml(
            r#"
name: forms
windows:
  - shell:
  - single: htop
  - many:
      - cd src
      - ls
  - 2: top
"#,
        );
        let project = normalize(&raw, &opts()).unwrap();
        let w = &project.windows;
        assert_eq!(w[0].panes, vec![Pane::default()]);
        assert_eq!(w[1].panes[0].commands, vec!["htop"]);
        assert_eq!(w[2].panes.len(), 1);
        assert_eq!(w[2].panes[0].commands, vec!["cd src", "ls"]);
        assert_eq!(w[3].name.as_deref(), Some("2"));
    }

    #[test]
    fn test_window_definition() {
        let raw = yaml(
            r#"
name: full
root: ~/src
windows:
  - logs:
      root: /var/log
      layout: main-vertical
      synchronize: true
      pre: cd app
      panes:
        - tail -f a.log
        - errors:
            - cd errors
            - tail -f b.log
        - [htop]
  - empty:
      panes: []
"#,
        );
        let project = normalize(&raw, &opts()).unwrap();
        let logs = &project.windows[0];
        assert_eq!(logs.root, Some(PathBuf::from("/var/log")));
        assert_eq!(logs.layout.as_deref(), Some("main-vertical"));
        assert!(logs.synchronized);
        assert_eq!(logs.pre, vec!["cd app"]);
        assert_eq!(logs.panes[1].title.as_deref(), Some("errors"));
        assert_eq!(logs.panes[1].commands, vec!["cd errors", "tail -f b.log"]);
        assert_eq!(logs.panes[2].commands, vec!["htop"]);
        assert_eq!(project.windows[1].panes, vec![Pane::default()]);
        assert_eq!(project.root, Some(PathBuf::from("~/src")));
    }

    #[test]
    fn test_deprecated_pre_string() {
        let raw = yaml("name: old\npre: sudo service mysql start\nwindows:\n  - main:\n");
        let project = normalize(&raw, &opts()).unwrap();
        assert_eq!(project.hooks.pre, vec!["sudo service mysql start"]);
        assert_eq!(project.deprecations.len(), 1);
        assert!(project.deprecations[0].contains("`pre`"));
    }

    #[test]
    fn test_deprecated_keys_match_current_keys() {
        let old = yaml(
            r#"
project_name: legacy
project_root: ~/legacy
pre: make deps
post: [echo ready]
pre_tab: source .env
cli_args: -f ~/.tmux.alt.conf
tabs:
  - editor: vim
  - console:
"#,
        );
        let new = yaml(
            r#"
name: legacy
root: ~/legacy
pre_hooks: [make deps]
post_hooks: echo ready
pre_window: source .env
tmux_options: -f ~/.tmux.alt.conf
windows:
  - editor: vim
  - console:
"#,
        );
        let mut from_old = normalize(&old, &opts()).unwrap();
        let from_new = normalize(&new, &opts()).unwrap();
        assert_eq!(from_old.deprecations.len(), 7);
        assert!(from_new.deprecations.is_empty());
        from_old.deprecations.clear();
        assert_eq!(from_old, from_new);
    }

    #[test]
    fn test_current_key_wins_over_alias() {
        let raw = yaml(
            "name: both\npre_window: nvm use\nrbenv: 3.2.0\nwindows:\n  - main:\n",
        );
        let project = normalize(&raw, &opts()).unwrap();
        assert_eq!(project.pre_window, vec!["nvm use"]);
        assert_eq!(project.deprecations.len(), 1);
    }

    #[test]
    fn test_first_alias_wins_for_shared_key() {
        let raw = yaml("name: ruby\nrvm: 3.1\nrbenv: 3.2.0\nwindows:\n  - main:\n");
        let project = normalize(&raw, &opts()).unwrap();
        assert_eq!(project.pre_window, vec!["rbenv shell 3.2.0"]);
        assert_eq!(project.deprecations.len(), 2);
        assert!(project.deprecations.iter().any(|d| d.contains("`rvm`")));
    }

    #[test]
    fn test_tagged_window_body_is_rejected() {
        let raw = yaml("name: t\nwindows:\n  - main: !cmd htop\n");
        assert_eq!(
            normalize(&raw, &opts()).unwrap_err(),
            ValidationError::invalid(
                "windows[0].main",
                "a command, a list of commands or a window definition"
            )
        );
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let raw = yaml("name: a\nbase_index: 4294967295\nwindows:\n  - main:\n");
        assert_eq!(
            normalize(&raw, &opts()).unwrap_err(),
            ValidationError::invalid("base_index", "an integer from 0 to 2147483647")
        );

        let raw = yaml("name: a\npane_base_index: -1\nwindows:\n  - main:\n");
        assert!(normalize(&raw, &opts()).is_err());

        let raw = yaml("name: a\nbase_index: 2147483647\nwindows:\n  - main:\n");
        assert_eq!(normalize(&raw, &opts()).unwrap().base_index, 2147483647);
    }

    #[test]
    fn test_rbenv_migrates_to_pre_window() {
        let raw = yaml("name: ruby\nrbenv: 2.0.0-p247\nwindows:\n  - main:\n");
        let project = normalize(&raw, &opts()).unwrap();
        assert_eq!(project.pre_window, vec!["rbenv shell 2.0.0-p247"]);
    }

    #[test]
    fn test_session_name_sources() {
        let raw = yaml("windows:\n  - main:\n");
        let stem = NormalizeOptions {
            file_stem: Some("from.file".into()),
            ..opts()
        };
        let project = normalize(&raw, &stem).unwrap();
        assert_eq!(project.name, "from.file");
        assert_eq!(project.session_name, "from_file");

        let custom = NormalizeOptions {
            custom_name: Some("alias".into()),
            ..stem
        };
        let project = normalize(&raw, &custom).unwrap();
        assert_eq!(project.name, "from.file");
        assert_eq!(project.session_name, "alias");

        assert_eq!(
            normalize(&raw, &opts()).unwrap_err(),
            ValidationError::MissingName
        );
    }

    #[test]
    fn test_attach_options() {
        let raw = yaml("name: a\nattach: false\nwindows:\n  - main:\n");
        let project = normalize(&raw, &opts()).unwrap();
        assert_eq!(project.attach_policy, AttachPolicy::Auto);
        assert!(!project.attach_by_default);

        let forced = NormalizeOptions {
            attach: Some(true),
            ..opts()
        };
        let project = normalize(&raw, &forced).unwrap();
        assert_eq!(project.attach_policy, AttachPolicy::ForceAttach);
    }

    #[test]
    fn test_indices_from_options_and_file() {
        let raw = yaml("name: a\npane_base_index: 1\nwindows:\n  - main:\n");
        let options = NormalizeOptions {
            base_index: 1,
            pane_base_index: 0,
            ..opts()
        };
        let project = normalize(&raw, &options).unwrap();
        assert_eq!(project.base_index, 1);
        assert_eq!(project.pane_base_index, 1);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            normalize(&yaml("- a\n- b\n"), &opts()).unwrap_err(),
            ValidationError::NotAMapping
        );
        assert_eq!(
            normalize(&yaml("name: a\n"), &opts()).unwrap_err(),
            ValidationError::NoWindows
        );
        assert_eq!(
            normalize(&yaml("name: a\nwindows: []\n"), &opts()).unwrap_err(),
            ValidationError::NoWindows
        );
        assert_eq!(
            normalize(&yaml("name: a\nwindows: main\n"), &opts()).unwrap_err(),
            ValidationError::invalid("windows", "a list of windows")
        );
    }

    #[test]
    fn test_invalid_field_names_location() {
        let raw = yaml("name: a\nwindows:\n  - main:\n      panes:\n        - {a: 1, b: 2}\n");
        match normalize(&raw, &opts()).unwrap_err() {
            ValidationError::InvalidField { field, .. } => {
                assert_eq!(field, "windows[0].main.panes[0]")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let raw = yaml("name: a\nattach: sometimes\nwindows:\n  - main:\n");
        assert_eq!(
            normalize(&raw, &opts()).unwrap_err(),
            ValidationError::invalid("attach", "true or false")
        );
    }
}
