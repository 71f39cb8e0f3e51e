//! Project to tmux script compilation.
//!
//! [`plan`] walks a [`Project`] and produces the ordered tmux commands that
//! build the session; [`compile`] renders that plan as a single shell script.
//! The script checks for an existing session first and only runs the
//! creation block when none is found:
//!
//! ```text
//! tmux has-session -t =demo 2>/dev/null
//!
//! if [ "$?" -ne 0 ]; then
//!   TMUX= tmux new-session -d -s demo -n editor
//!   tmux send-keys -t demo:0.0 vim C-m
//!   ...
//!   tmux select-window -t demo:0
//!   tmux select-pane -t demo:0.0
//! fi
//!
//! if [ -z "$TMUX" ]; then
//!   tmux -u attach-session -t =demo
//! else
//!   tmux -u switch-client -t =demo
//! fi
//! ```
//!
//! # Window Order
//!
//! Windows are built one at a time in declared order: create the window,
//! split it, apply its layout, type every pane's commands, then toggle
//! `synchronize-panes`. tmux keys windows and panes by index, so the order
//! of the emitted commands is part of the output contract.
//!
//! # Splits
//!
//! Each extra pane splits the most recently created pane, alternating
//! horizontal (`-h`) and vertical (`-v`). Splitting the last pane keeps
//! pane indices equal to declaration order. After every split the window is
//! rebalanced with `select-layout tiled`, otherwise repeated halving runs out
//! of room ("no space for new pane") around a dozen panes. A declared layout
//! is applied once, after the window's last split.

use crate::error::CompileError;
use crate::project::{Project, Window};
use crate::tmux::{Split, Target, Tmux, TmuxCommand};
use tracing::debug;

/// Layout used to make room between splits.
const REBALANCE_LAYOUT: &str = "tiled";

/// The ordered tmux commands for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    tmux: Tmux,
    session: String,
    /// The existence check.
    pub check: TmuxCommand,
    /// Everything run when the session does not exist yet.
    pub create: Vec<TmuxCommand>,
    pub attach_when_created: bool,
    pub attach_when_existing: bool,
}

impl Plan {
    fn attach(&self) -> TmuxCommand {
        TmuxCommand::AttachSession {
            session: self.session.clone(),
        }
    }

    /// Commands that run when no session with this name exists.
    pub fn fresh_path(&self) -> Vec<TmuxCommand> {
        let mut commands = vec![self.check.clone()];
        commands.extend(self.create.iter().cloned());
        if self.attach_when_created {
            commands.push(self.attach());
        }
        commands
    }

    /// Commands that run when the session is already up.
    pub fn existing_path(&self) -> Vec<TmuxCommand> {
        let mut commands = vec![self.check.clone()];
        if self.attach_when_existing {
            commands.push(self.attach());
        }
        commands
    }

    /// Render as a shell script.
    pub fn render(&self) -> String {
        let mut lines = vec![self.tmux.render(&self.check), String::new()];

        lines.push("if [ \"$?\" -ne 0 ]; then".into());
        for command in &self.create {
            lines.push(format!("  {}", self.tmux.render(command)));
        }
        if self.attach_when_existing && !self.attach_when_created {
            lines.push("else".into());
            lines.extend(self.attach_block().into_iter().map(|l| format!("  {}", l)));
        }
        lines.push("fi".into());

        if self.attach_when_existing && self.attach_when_created {
            lines.push(String::new());
            lines.extend(self.attach_block());
        }

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    /// Attach from a plain terminal, switch when already inside tmux.
    fn attach_block(&self) -> Vec<String> {
        let switch = TmuxCommand::SwitchClient {
            session: self.session.clone(),
        };
        vec![
            "if [ -z \"$TMUX\" ]; then".into(),
            format!("  {}", self.tmux.render(&self.attach())),
            "else".into(),
            format!("  {}", self.tmux.render(&switch)),
            "fi".into(),
        ]
    }
}

/// Compile a project into a launch script.
///
/// # Errors
///
/// [`CompileError`] when the project breaks an invariant that
/// [`normalize`](crate::normalize::normalize) guarantees.
pub fn compile(project: &Project) -> Result<String, CompileError> {
    Ok(plan(project)?.render())
}

/// Build the ordered command plan for a project.
pub fn plan(project: &Project) -> Result<Plan, CompileError> {
    check(project)?;

    let session = project.session_name.as_str();
    let first = Target::pane(session, project.base_index, project.pane_base_index);
    let mut create = Vec::new();

    for (i, window) in project.windows.iter().enumerate() {
        let index = project.base_index + i as u32;
        let root = project.window_root(window).map(|r| r.to_path_buf());

        if i == 0 {
            create.push(TmuxCommand::NewSession {
                session: session.to_string(),
                window: window.name.clone(),
                root: root.clone(),
            });
            create.extend(send_all(&first, &project.hooks.pre));
        } else {
            create.push(TmuxCommand::NewWindow {
                target: Target::window(session, index),
                name: window.name.clone(),
                root: root.clone(),
            });
        }

        build_window(project, window, index, &mut create);
    }

    create.extend(send_all(&first, &project.hooks.post));
    create.push(TmuxCommand::SelectWindow {
        target: Target::window(session, project.base_index),
    });
    create.push(TmuxCommand::SelectPane { target: first });

    debug!(session, commands = create.len(), "compiled project");

    Ok(Plan {
        tmux: Tmux::for_project(project),
        session: session.to_string(),
        check: TmuxCommand::HasSession {
            session: session.to_string(),
        },
        create,
        attach_when_created: project.attach_when_created(),
        attach_when_existing: project.attach_when_existing(),
    })
}

fn check(project: &Project) -> Result<(), CompileError> {
    if project.session_name.trim().is_empty() {
        return Err(CompileError::EmptySessionName);
    }
    if project.windows.is_empty() {
        return Err(CompileError::NoWindows);
    }
    if let Some(i) = project.windows.iter().position(|w| w.panes.is_empty()) {
        return Err(CompileError::NoPanes(i));
    }

    let fits = |base: u32, count: usize| {
        u32::try_from(count)
            .ok()
            .and_then(|n| base.checked_add(n))
            .is_some()
    };
    let most_panes = project.windows.iter().map(|w| w.panes.len()).max().unwrap_or(0);
    if !fits(project.base_index, project.windows.len())
        || !fits(project.pane_base_index, most_panes)
    {
        return Err(CompileError::IndexOutOfRange);
    }
    Ok(())
}

/// Splits, layout, pane commands and synchronization for one window.
fn build_window(project: &Project, window: &Window, index: u32, out: &mut Vec<TmuxCommand>) {
    let session = project.session_name.as_str();
    let pane_base = project.pane_base_index;
    let root = project.window_root(window).map(|r| r.to_path_buf());

    for k in 1..window.panes.len() as u32 {
        let split = if k % 2 == 1 {
            Split::Horizontal
        } else {
            Split::Vertical
        };
        out.push(TmuxCommand::SplitWindow {
            target: Target::pane(session, index, pane_base + k - 1),
            split,
            root: root.clone(),
        });
        out.push(TmuxCommand::SelectLayout {
            target: Target::window(session, index),
            layout: REBALANCE_LAYOUT.to_string(),
        });
    }

    if let Some(layout) = &window.layout {
        out.push(TmuxCommand::SelectLayout {
            target: Target::window(session, index),
            layout: layout.clone(),
        });
    }

    for (j, pane) in window.panes.iter().enumerate() {
        let target = Target::pane(session, index, pane_base + j as u32);
        if let Some(title) = &pane.title {
            out.push(TmuxCommand::SetPaneTitle {
                target: target.clone(),
                title: title.clone(),
            });
        }
        let commands = project
            .pre_window
            .iter()
            .chain(&window.pre)
            .chain(&pane.commands);
        out.extend(commands.map(|keys| TmuxCommand::SendKeys {
            target: target.clone(),
            keys: keys.clone(),
        }));
    }

    if window.synchronized {
        out.push(TmuxCommand::SynchronizePanes {
            target: Target::window(session, index),
        });
    }
}

fn send_all(target: &Target, commands: &[String]) -> Vec<TmuxCommand> {
    commands
        .iter()
        .map(|keys| TmuxCommand::SendKeys {
            target: target.clone(),
            keys: keys.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{NormalizeOptions, normalize};
    use crate::project::AttachPolicy;

    fn project(src: &str) -> Project {
        project_with(src, NormalizeOptions::default())
    }

    fn project_with(src: &str, options: NormalizeOptions) -> Project {
        let raw: serde_yaml::Value = serde_yaml::from_str(src).unwrap();
        normalize(&raw, &options).unwrap()
    }

    const DEMO: &str = r#"
name: demo
windows:
  - editor:
      panes:
        - vim
  - server:
      panes:
        -
        - npm start
"#;

    #[test]
    fn test_demo_script() {
        let script = compile(&project(DEMO)).unwrap();
        let expected = "\
tmux has-session -t =demo 2>/dev/null

if [ \"$?\" -ne 0 ]; then
  TMUX= tmux new-session -d -s demo -n editor
  tmux send-keys -t demo:0.0 vim C-m
  tmux new-window -t demo:1 -n server
  tmux split-window -h -t demo:1.0
  tmux select-layout -t demo:1 tiled
  tmux send-keys -t demo:1.1 'npm start' C-m
  tmux select-window -t demo:0
  tmux select-pane -t demo:0.0
fi

if [ -z \"$TMUX\" ]; then
  tmux -u attach-session -t =demo
else
  tmux -u switch-client -t =demo
fi
";
        assert_eq!(script, expected);
    }

    #[test]
    fn test_window_and_split_counts() {
        let p = project(
            r#"
name: counts
windows:
  - one:
  - two:
      panes: [a, b, c, d]
  - three:
      layout: tiled
      panes: [a, b]
"#,
        );
        let plan = plan(&p).unwrap();
        let created = plan.create.iter().filter(|c| c.creates_window()).count();
        assert_eq!(created, p.windows.len());

        for (i, window) in p.windows.iter().enumerate() {
            let splits = plan
                .create
                .iter()
                .filter(|c| {
                    matches!(c, TmuxCommand::SplitWindow { target, .. }
                        if target.window == Some(i as u32))
                })
                .count();
            assert_eq!(splits, window.panes.len() - 1);
        }
    }

    #[test]
    fn test_split_alternates_from_last_pane() {
        let p = project("name: s\nwindows:\n  - w:\n      panes: [a, b, c]\n");
        let splits: Vec<_> = plan(&p)
            .unwrap()
            .create
            .into_iter()
            .filter_map(|c| match c {
                TmuxCommand::SplitWindow { target, split, .. } => Some((target.pane, split)),
                _ => None,
            })
            .collect();
        assert_eq!(
            splits,
            vec![(Some(0), Split::Horizontal), (Some(1), Split::Vertical)]
        );
    }

    #[test]
    fn test_reuse_path_has_no_creation() {
        let plan = plan(&project(DEMO)).unwrap();
        let existing = plan.existing_path();
        assert_eq!(existing.len(), 2);
        assert!(matches!(existing[0], TmuxCommand::HasSession { .. }));
        assert!(matches!(existing[1], TmuxCommand::AttachSession { .. }));
        assert!(!existing.iter().any(|c| c.creates_window()));
    }

    #[test]
    fn test_force_detach_never_attaches() {
        let options = NormalizeOptions {
            attach: Some(false),
            ..Default::default()
        };
        let p = project_with(DEMO, options);
        assert_eq!(p.attach_policy, AttachPolicy::ForceDetach);
        let plan = plan(&p).unwrap();
        assert_eq!(plan.existing_path().len(), 1);
        assert!(!plan
            .fresh_path()
            .iter()
            .any(|c| matches!(c, TmuxCommand::AttachSession { .. })));

        let script = plan.render();
        assert!(!script.contains("attach-session"));
        assert!(!script.contains("switch-client"));
        assert!(script.ends_with("fi\n"));
    }

    #[test]
    fn test_attach_false_only_attaches_existing() {
        let p = project("name: quiet\nattach: false\nwindows:\n  - main:\n");
        let script = compile(&p).unwrap();
        let else_at = script.find("else").unwrap();
        let attach_at = script.find("attach-session").unwrap();
        let new_at = script.find("new-session").unwrap();
        assert!(new_at < else_at && else_at < attach_at);
        assert_eq!(script.matches("attach-session").count(), 1);
    }

    #[test]
    fn test_session_check_ignores_prefix_matches() {
        let script = compile(&project(DEMO)).unwrap();
        assert!(script.starts_with("tmux has-session -t =demo 2>/dev/null\n"));
        for line in script.lines().filter(|l| {
            l.contains("has-session") || l.contains("attach-session") || l.contains("switch-client")
        }) {
            assert!(line.contains("-t =demo"), "{line}");
        }

        // "demo-old" running must not count as "demo": no bare session target.
        assert!(!script.contains("-t demo "));
        assert!(!script.contains("-t demo\n"));
    }

    #[test]
    fn test_many_panes_rebalance_after_each_split() {
        let panes: Vec<String> = (0..12).map(|i| format!("        - echo {}", i)).collect();
        let src = format!(
            "name: grid\nwindows:\n  - w:\n      layout: main-horizontal\n      panes:\n{}\n",
            panes.join("\n")
        );
        let plan = plan(&project(&src)).unwrap();

        let layouts: Vec<(usize, &str)> = plan
            .create
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                TmuxCommand::SelectLayout { layout, .. } => Some((i, layout.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(layouts.len(), 12);
        assert!(layouts[..11].iter().all(|(_, l)| *l == "tiled"));
        assert_eq!(layouts[11].1, "main-horizontal");

        for (i, command) in plan.create.iter().enumerate() {
            if matches!(command, TmuxCommand::SplitWindow { .. }) {
                assert!(matches!(
                    plan.create[i + 1],
                    TmuxCommand::SelectLayout { ref layout, .. } if layout == "tiled"
                ));
            }
        }

        let last_split = plan
            .create
            .iter()
            .rposition(|c| matches!(c, TmuxCommand::SplitWindow { .. }))
            .unwrap();
        assert!(last_split < layouts[11].0);

        let sends: Vec<u32> = plan
            .create
            .iter()
            .filter_map(|c| match c {
                TmuxCommand::SendKeys { target, .. } => target.pane,
                _ => None,
            })
            .collect();
        assert_eq!(sends, (0..12).collect::<Vec<u32>>());
    }

    #[test]
    fn test_index_overflow_is_rejected() {
        let mut p = project(DEMO);
        p.base_index = u32::MAX;
        assert_eq!(compile(&p).unwrap_err(), CompileError::IndexOutOfRange);

        let mut p = project(DEMO);
        p.pane_base_index = u32::MAX - 1;
        assert_eq!(compile(&p).unwrap_err(), CompileError::IndexOutOfRange);
    }

    #[test]
    fn test_idempotent() {
        let p = project(DEMO);
        assert_eq!(compile(&p).unwrap(), compile(&p).unwrap());
    }

    #[test]
    fn test_hooks_layout_and_sync_order() {
        let p = project(
            r#"
name: order
pre_hooks: [docker compose up -d]
post_hooks: echo ready
pre_window: source .env
windows:
  - main:
      layout: main-vertical
      synchronize: true
      panes: [htop, top]
  - logs: tail -f log
"#,
        );
        let lines: Vec<String> = compile(&p)
            .unwrap()
            .lines()
            .map(|l| l.trim().to_string())
            .collect();
        let at = |needle: &str| {
            lines
                .iter()
                .position(|l| l.contains(needle))
                .unwrap_or_else(|| panic!("missing {needle}"))
        };

        assert!(at("new-session") < at("docker compose up -d"));
        assert!(at("docker compose up -d") < at("split-window"));
        assert!(at("split-window") < at("select-layout -t order:0 main-vertical"));
        assert!(at("select-layout") < at("send-keys -t order:0.0 'source .env'"));
        assert!(at("send-keys -t order:0.1 top") < at("synchronize-panes"));
        assert!(at("synchronize-panes") < at("new-window"));
        assert!(at("'tail -f log'") < at("'echo ready'"));
        assert!(at("'echo ready'") < at("select-window"));
        assert_eq!(
            lines[at("'echo ready'")],
            "tmux send-keys -t order:0.0 'echo ready' C-m"
        );
        assert_eq!(lines.iter().filter(|l| l.contains("'source .env'")).count(), 3);
    }

    #[test]
    fn test_socket_roots_and_indices() {
        let options = NormalizeOptions {
            base_index: 1,
            pane_base_index: 1,
            ..Default::default()
        };
        let p = project_with(
            r#"
name: sock
socket_name: work
root: ~/src/sock
windows:
  - one:
      panes: [a, b]
  - two:
      root: /tmp/other dir
"#,
            options,
        );
        let script = compile(&p).unwrap();
        for line in script.lines().filter(|l| l.contains("tmux ")) {
            assert!(line.contains("tmux -L work "), "{line}");
        }
        assert!(script.contains("new-session -d -s sock -n one -c ~/src/sock"));
        assert!(script.contains("split-window -h -c ~/src/sock -t sock:1.1"));
        assert!(script.contains("send-keys -t sock:1.2 b C-m"));
        assert!(script.contains("new-window -c '/tmp/other dir' -t sock:2 -n two"));
        assert!(script.contains("select-pane -t sock:1.1"));
    }

    #[test]
    fn test_pane_titles() {
        let p = project("name: t\nwindows:\n  - w:\n      panes:\n        - api: cargo run\n");
        let script = compile(&p).unwrap();
        assert!(script.contains("tmux select-pane -t t:0.0 -T api"));
    }

    #[test]
    fn test_broken_invariants() {
        let mut p = project(DEMO);
        p.session_name.clear();
        assert_eq!(compile(&p).unwrap_err(), CompileError::EmptySessionName);

        let mut p = project(DEMO);
        p.windows[1].panes.clear();
        assert_eq!(compile(&p).unwrap_err(), CompileError::NoPanes(1));

        let mut p = project(DEMO);
        p.windows.clear();
        assert_eq!(compile(&p).unwrap_err(), CompileError::NoWindows);
    }
}
