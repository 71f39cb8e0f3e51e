//! Muxinate CLI entry point.
//!
//! This binary provides the `muxinate` command: it resolves project files,
//! hands them to the normalizer and compiler, and launches the result.

use clap::Parser;
use muxinate::cli::{Cli, Commands, LaunchArgs, PROJECT_COMMANDS, commands_text};
use muxinate::error::Result;
use muxinate::launch::{self, Environment};
use muxinate::loader::{self, ProjectDir};
use muxinate::normalize::{NormalizeOptions, normalize};
use dialoguer::Confirm;
use muxinate::tmux::{self, Tmux};
use muxinate::{MuxinateError, Project, ValidationError, interpolate};
use std::io;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `MUXINATE_LOG` (default `warn`).
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MUXINATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Main application logic.
fn run() -> Result<()> {
    let cli = Cli::parse();
    let env = Environment::from_env();
    let dir = ProjectDir::locate()?;

    match cli.command {
        Commands::Commands { shell } => println!("{}", commands_text(shell.as_deref())),
        Commands::Completions { arg } => {
            if PROJECT_COMMANDS.contains(&arg.as_str()) {
                for name in dir.list()? {
                    println!("{}", name);
                }
            }
        }
        Commands::New { project } => new_project(&dir, &env, &project)?,
        Commands::Start(args) => {
            let project = build_project(&dir, &args, true)?;
            let prepared = launch::start(&project, &env)?;
            launch::acknowledge_deprecations(
                project.deprecations(),
                io::stdin().lock(),
                io::stdout(),
            )?;
            launch::run(prepared)?;
        }
        Commands::Debug(args) => {
            let project = build_project(&dir, &args, false)?;
            launch::run(launch::debug(&project)?)?;
        }
        Commands::Copy { existing, new } => copy_project(&dir, &env, &existing, &new)?,
        Commands::Delete { project } => delete_project(&dir, &project)?,
        Commands::Implode => {
            if confirm("Are you sure you want to delete all muxinate configs?")? {
                if dir.root().exists() {
                    std::fs::remove_dir_all(dir.root())?;
                }
                println!("Deleted all muxinate projects.");
            }
        }
        Commands::List => {
            println!("muxinate projects:");
            print_columns(&dir.list()?);
        }
        Commands::Version => println!("muxinate {}", env!("CARGO_PKG_VERSION")),
        Commands::Doctor => doctor(&env),
    }

    Ok(())
}

/// Resolve, load and normalize the project named on the command line.
///
/// Unless the project sets them, the base indices come from the project's
/// own tmux server. `start_server` is false for `debug`, which must not
/// leave a server running.
fn build_project(dir: &ProjectDir, args: &LaunchArgs, start_server: bool) -> Result<Project> {
    let path = dir.project_path(&args.project);
    if !path.is_file() {
        return Err(MuxinateError::ProjectNotFound(path));
    }

    let (custom_name, settings) = args.split();
    let settings = interpolate::parse_settings(&settings)?;
    let raw = loader::load_project(&path, &settings)?;

    let mut options = NormalizeOptions {
        attach: args.attach(),
        custom_name,
        file_stem: Some(args.project.clone()),
        ..Default::default()
    };
    let invalid = |source: ValidationError| MuxinateError::Invalid {
        path: path.clone(),
        source,
    };

    let draft = normalize(&raw, &options).map_err(invalid)?;
    let server = Tmux::for_project(&draft);
    options.base_index = server.global_index_or_default("base-index", start_server);
    options.pane_base_index = server.global_index_or_default("pane-base-index", start_server);

    normalize(&raw, &options).map_err(invalid)
}

fn new_project(dir: &ProjectDir, env: &Environment, name: &str) -> Result<()> {
    let path = dir.project_path(name);
    if !path.is_file() {
        dir.ensure()?;
        std::fs::write(&path, loader::new_project_text(dir, name)?)?;
    }
    edit_or_diagnose(env, &path)
}

fn copy_project(dir: &ProjectDir, env: &Environment, existing: &str, new: &str) -> Result<()> {
    if !dir.exists(existing) {
        return Err(MuxinateError::ProjectNotFound(dir.project_path(existing)));
    }
    let from = dir.project_path(existing);
    let extension = from.extension().and_then(|e| e.to_str()).unwrap_or("yml");
    let to = if dir.exists(new) {
        dir.project_path(new)
    } else {
        dir.root().join(format!("{}.{}", new, extension))
    };

    let overwrite = dir.exists(new);
    if !overwrite || confirm(&format!("{} already exists, would you like to overwrite it?", new))? {
        if overwrite {
            println!("Overwriting {}", new);
        }
        std::fs::copy(&from, &to)?;
    }
    edit_or_diagnose(env, &to)
}

fn delete_project(dir: &ProjectDir, name: &str) -> Result<()> {
    if !dir.exists(name) {
        return Err(MuxinateError::ProjectNotFound(dir.project_path(name)));
    }
    if confirm(&format!("Are you sure you want to delete {}?", name))? {
        std::fs::remove_file(dir.project_path(name))?;
        println!("Deleted {}", name);
    }
    Ok(())
}

/// Open the editor; if that fails, show what is missing.
fn edit_or_diagnose(env: &Environment, path: &std::path::Path) -> Result<()> {
    if let Err(e) = launch::open_in_editor(env, path) {
        eprintln!("Error: {}", e);
        doctor(env);
    }
    Ok(())
}

fn doctor(env: &Environment) {
    let checks = [
        ("Checking if tmux is installed ==> ", tmux::installed("tmux")),
        ("Checking if $EDITOR is set ==> ", env.editor.is_some()),
        ("Checking if $SHELL is set ==> ", env.shell_set),
    ];
    for (label, ok) in checks {
        println!("{}{}", label, if ok { "Yes" } else { "No" });
    }
}

/// Ask a yes/no question, defaulting to no.
fn confirm(question: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(question)
        .default(false)
        .interact()?)
}

/// Print names in columns sized to the longest one.
fn print_columns(names: &[String]) {
    let width = names.iter().map(|n| n.len()).max().unwrap_or(0) + 2;
    let per_row = (80 / width.max(1)).max(1);
    for row in names.chunks(per_row) {
        let line: String = row.iter().map(|n| format!("{:<width$}", n)).collect();
        println!("{}", line.trim_end());
    }
}
