//! The engine's caller: target selection, pre-flight checks, and actual
//! subprocess execution of the argv the fan-out driver yields.

use crate::engine::{EnvSnapshot, Fanout, WrapMode};
use anyhow::{Context, Result};
use colored::*;
use polyrepo_core::{CommandRecord, RuntimeConfig};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub commands: Vec<String>,
    /// Exact repository names; empty means the caller-defined default
    /// (all repositories for `exec`, the template's own set for `run`).
    pub targets: Vec<String>,
    pub shell: bool,
    pub python: bool,
    pub venv: Option<String>,
    pub verbose: bool,
    pub raise_errors: bool,
}

/// Ad-hoc fan-out: `poly exec`. Empty target list means every repository.
pub fn exec(config: &RuntimeConfig, mut opts: ApplyOptions) -> Result<()> {
    if opts.targets.is_empty() {
        opts.targets = config.manifest.repos.keys().cloned().collect();
    } else {
        opts.targets = known_targets(config, &opts.targets);
    }
    apply(config, opts)
}

/// Fan out a stored command template: `poly run <name>`.
pub fn run_named(config: &RuntimeConfig, name: &str, repos_override: &[String]) -> Result<()> {
    let record = config
        .manifest
        .commands
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("No stored command named '{}'", name))?;

    let targets = if !repos_override.is_empty() {
        known_targets(config, repos_override)
    } else {
        default_targets(config, record)
    };

    apply(
        config,
        ApplyOptions {
            commands: record.commands.clone(),
            targets,
            shell: record.shell,
            python: record.python,
            venv: record.venv.clone(),
            verbose: record.verbose,
            raise_errors: record.raise_errors,
        },
    )
}

/// The target set a template applies to when none is given on the command
/// line: everything for `all`, else its named repositories plus tag
/// matches, else just the primary metarepo.
fn default_targets(config: &RuntimeConfig, record: &CommandRecord) -> Vec<String> {
    if record.all {
        return config.manifest.repos.keys().cloned().collect();
    }

    let mut targets = known_targets(config, &record.repositories);
    for name in config.manifest.repos_with_tags(&record.tags) {
        if !targets.contains(&name) {
            targets.push(name);
        }
    }
    if targets.is_empty() {
        if let Some((name, _)) = config.manifest.primary() {
            targets.push(name.clone());
        }
    }
    targets
}

fn known_targets(config: &RuntimeConfig, names: &[String]) -> Vec<String> {
    let mut known = Vec::new();
    for name in names {
        if config.manifest.repo_exists(name) {
            known.push(name.clone());
        } else {
            eprintln!("Repository '{}' is not tracked in the manifest", name);
        }
    }
    known
}

fn apply(config: &RuntimeConfig, opts: ApplyOptions) -> Result<()> {
    let root = config
        .root()
        .ok_or_else(|| anyhow::anyhow!("No .polyrepo manifest found. Run 'poly init' first."))?;

    if opts.commands.is_empty() {
        return Err(anyhow::anyhow!("Nothing to run"));
    }
    if opts.commands.len() > 1 && !opts.shell && !opts.python && opts.venv.is_none() {
        return Err(anyhow::anyhow!(
            "Multiple commands require --shell (a plain argv cannot chain statements)"
        ));
    }

    // Caller-side contracts, checked before any working-directory mutation.
    let venv_path = resolve_venv(config, opts.venv.as_deref())?;
    if opts.python {
        preflight_python(&opts.commands)?;
    }

    let mode = WrapMode {
        shell: opts.shell,
        python: opts.python,
        venv: venv_path,
    };
    let fanout = Fanout::new(
        &config.manifest,
        root,
        opts.commands,
        &opts.targets,
        mode,
        EnvSnapshot::capture(),
    );

    let total = fanout.remaining();
    let mut succeeded = 0;
    let mut failed: Vec<String> = Vec::new();

    for (idx, item) in fanout.enumerate() {
        match item {
            Ok((name, argv)) => {
                println!("\n[{}/{}] {}", idx + 1, total, name.bold());
                if opts.verbose {
                    println!("  {} {}", "►".bright_black(), argv.join(" "));
                }
                match run_argv(&argv) {
                    Ok(()) => {
                        succeeded += 1;
                        println!("  {}", "ok".green());
                    }
                    Err(e) if opts.raise_errors => {
                        return Err(e.context(format!("Command failed in '{}'", name)))
                    }
                    Err(e) => {
                        eprintln!("  {} {}", "failed:".red(), e);
                        failed.push(name);
                    }
                }
            }
            Err(e) if opts.raise_errors => return Err(e.into()),
            Err(e) => eprintln!("{} {}", "failed:".red(), e),
        }
    }

    println!(
        "\n{} {} succeeded, {} failed",
        "Summary:".bright_black(),
        succeeded.to_string().green(),
        if failed.is_empty() {
            "0".bright_black().to_string()
        } else {
            failed.len().to_string().red().to_string()
        }
    );
    Ok(())
}

/// Look the venv name up before the engine runs; the Command Wrapper
/// assumes a valid, resolved path.
fn resolve_venv(config: &RuntimeConfig, venv: Option<&str>) -> Result<Option<PathBuf>> {
    match venv {
        None => Ok(None),
        Some(name) => config
            .manifest
            .virtualenvs
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Virtualenv '{}' is not registered", name)),
    }
}

/// Verify every template compiles as a standalone Python script body, so an
/// invalid template aborts before the first repository is entered. The body
/// is piped on stdin to sidestep shell quoting.
fn preflight_python(templates: &[String]) -> Result<()> {
    for template in templates {
        let mut child = Command::new("python3")
            .args(["-c", "import sys; compile(sys.stdin.read(), '<template>', 'exec')"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to start python3 for template validation")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(template.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "Template is not a valid Python script: {}\n{}",
                template,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
    }
    Ok(())
}

/// Run one prepared argv in the current working directory (the fan-out
/// driver has already scoped it to the repository), streaming stdout.
fn run_argv(argv: &[String]) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("Empty argv"))?;

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context(format!("Failed to spawn '{}'", program))?;

    if let Some(stdout) = child.stdout.take() {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            println!("  {}", line?);
        }
    }

    let status = child.wait()?;

    if !status.success() {
        if let Some(stderr) = child.stderr.take() {
            let reader = BufReader::new(stderr);
            for line in reader.lines() {
                eprintln!("  {}", line?);
            }
        }
        return Err(anyhow::anyhow!(
            "Command failed with exit code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    Ok(())
}
