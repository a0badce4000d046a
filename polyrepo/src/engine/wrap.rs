//! Command wrapping: from resolved command strings to a final argv.
//!
//! Four strategies, composable in the order venv > python > shell > plain.
//! Every branch except plain embeds a nested `$SHELL -c` invocation; plain
//! tokenizes directly and is the only mode that hands the caller a raw argv.

use super::EngineError;
use std::path::PathBuf;

/// How the resolved command strings should be packaged for execution.
#[derive(Debug, Clone, Default)]
pub struct WrapMode {
    pub shell: bool,
    pub python: bool,
    /// Resolved virtualenv root. Callers look the name up in the manifest's
    /// virtualenv table before building a `WrapMode`.
    pub venv: Option<PathBuf>,
}

/// The shell executable used by every shell-wrapped mode. Resolved once at
/// startup by the driver's callers.
pub fn system_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

/// Package `commands` into one argv according to `mode`.
pub fn wrap(
    commands: &[String],
    mode: &WrapMode,
    shell_path: &str,
) -> Result<Vec<String>, EngineError> {
    let commands: Vec<String> = if mode.python {
        commands.iter().map(|c| python_wrap(c)).collect()
    } else {
        commands.to_vec()
    };

    let joined = commands.join(" && ");

    if let Some(venv) = &mode.venv {
        let activated = format!(". {}/bin/activate && {}", venv.display(), joined);
        return Ok(shell_argv(shell_path, activated));
    }

    // Python mode always implies a nested shell: each `python3 -c '...'`
    // invocation is itself a shell-level token.
    if mode.python || mode.shell {
        return Ok(shell_argv(shell_path, joined));
    }

    // Plain mode: POSIX word-splitting into a direct argv. With multiple
    // commands the `&&` survives as a literal token, since no shell is
    // present to interpret it.
    shlex::split(&joined).ok_or(EngineError::CommandParse(joined))
}

fn shell_argv(shell_path: &str, command: String) -> Vec<String> {
    vec![shell_path.to_string(), "-c".to_string(), command]
}

/// Wrap one script body as a shell-level `python3 -c` token. Embedded double
/// quotes are backslash-escaped because the joined string historically lived
/// inside an outer double-quoted shell command.
fn python_wrap(command: &str) -> String {
    format!("python3 -c '{}'", command.replace('"', "\\\""))
}
