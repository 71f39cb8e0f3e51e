//! Launching a compiled project.
//!
//! The launch driver is the only place that looks at the process
//! environment or touches the terminal. It reads `$SHELL` and `$EDITOR` once
//! into an [`Environment`], shows deprecation warnings and waits for the user
//! to acknowledge them, then either prints the script or replaces the current
//! process with a shell running it.

use crate::compiler;
use crate::error::{MuxinateError, Result};
use crate::project::Project;
use std::io::{self, BufRead, Write};
use std::process::Command;
use tracing::info;

/// Values read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Shell used to run the script (`$SHELL`, else `/bin/sh`).
    pub shell: String,
    pub editor: Option<String>,
    /// Whether `$SHELL` was actually set.
    pub shell_set: bool,
}

impl Environment {
    pub fn from_env() -> Self {
        let shell = std::env::var("SHELL").ok().filter(|s| !s.is_empty());
        Environment {
            shell_set: shell.is_some(),
            shell: shell.unwrap_or_else(|| "/bin/sh".to_string()),
            editor: std::env::var("EDITOR").ok().filter(|e| !e.is_empty()),
        }
    }
}

/// What the binary should do with a compiled project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Print the script and stop.
    Print(String),
    /// Replace this process with `shell -c command`.
    ProcessReplacement { shell: String, command: String },
}

/// Compile `project` for `debug` output.
pub fn debug(project: &Project) -> Result<Launch> {
    Ok(Launch::Print(compiler::compile(project)?))
}

/// Compile `project` for `start`.
pub fn start(project: &Project, env: &Environment) -> Result<Launch> {
    Ok(Launch::ProcessReplacement {
        shell: env.shell.clone(),
        command: compiler::compile(project)?,
    })
}

/// Print each deprecation and block until the user presses ENTER.
///
/// Does nothing when the list is empty.
pub fn acknowledge_deprecations<R: BufRead, W: Write>(
    deprecations: &[String],
    mut input: R,
    mut output: W,
) -> io::Result<()> {
    if deprecations.is_empty() {
        return Ok(());
    }
    for deprecation in deprecations {
        writeln!(output, "{}", deprecation)?;
    }
    writeln!(output)?;
    write!(output, "Press ENTER to continue.")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Carry out a launch. For [`Launch::ProcessReplacement`] this only
/// returns on failure.
pub fn run(launch: Launch) -> Result<()> {
    match launch {
        Launch::Print(script) => {
            print!("{}", script);
            Ok(())
        }
        Launch::ProcessReplacement { shell, command } => {
            info!(shell = %shell, "replacing process with launch script");
            exec(&shell, &command)
        }
    }
}

#[cfg(unix)]
fn exec(shell: &str, command: &str) -> Result<()> {
    use std::os::unix::process::CommandExt;

    let err = Command::new(shell).arg("-c").arg(command).exec();
    Err(MuxinateError::IoError(err))
}

#[cfg(not(unix))]
fn exec(shell: &str, command: &str) -> Result<()> {
    let status = Command::new(shell).arg("-c").arg(command).status()?;
    std::process::exit(status.code().unwrap_or(1));
}

/// Open `path` in `$EDITOR` through the user's shell.
///
/// # Errors
///
/// [`MuxinateError::MissingEnv`] if `$EDITOR` is unset, or an I/O error if
/// the editor exits unsuccessfully.
pub fn open_in_editor(env: &Environment, path: &std::path::Path) -> Result<()> {
    let editor = env.editor.as_deref().ok_or(MuxinateError::MissingEnv("EDITOR"))?;
    let line = format!("{} {}", editor, crate::shell::escape_path(path));
    let status = Command::new(&env.shell).arg("-c").arg(&line).status()?;
    if !status.success() {
        return Err(MuxinateError::IoError(io::Error::other(format!(
            "{} exited with {}",
            editor, status
        ))));
    }
    Ok(())
}
