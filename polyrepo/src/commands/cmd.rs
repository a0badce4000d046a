//! Command-store management: named, reusable command templates.

use anyhow::Result;
use colored::*;
use polyrepo_core::{CommandRecord, RuntimeConfig};

pub fn add(config: &mut RuntimeConfig, name: &str, record: CommandRecord) -> Result<()> {
    if record.commands.is_empty() {
        return Err(anyhow::anyhow!("A command template needs at least one command"));
    }
    // Multi-statement sequences need shell-level chaining; a plain argv
    // cannot chain statements.
    if record.commands.len() > 1 && !record.shell && !record.python && record.venv.is_none() {
        return Err(anyhow::anyhow!(
            "Templates with multiple commands require --shell (or --python/--venv)"
        ));
    }
    if let Some(venv) = &record.venv {
        if !config.manifest.virtualenvs.contains_key(venv) {
            return Err(anyhow::anyhow!("Virtualenv '{}' is not registered", venv));
        }
    }

    config.manifest.commands.insert(name.to_string(), record);
    config.save()?;

    println!("Stored command '{}'", name);
    Ok(())
}

pub fn remove(config: &mut RuntimeConfig, name: &str) -> Result<()> {
    if config.manifest.commands.shift_remove(name).is_none() {
        return Err(anyhow::anyhow!("No stored command named '{}'", name));
    }
    config.save()?;

    println!("Removed command '{}'", name);
    Ok(())
}

pub fn list(config: &RuntimeConfig) -> Result<()> {
    if config.manifest.commands.is_empty() {
        println!("No stored commands. Use 'poly cmd add'.");
        return Ok(());
    }

    for (name, record) in &config.manifest.commands {
        let mut modes = Vec::new();
        if record.shell {
            modes.push("shell".to_string());
        }
        if record.python {
            modes.push("python".to_string());
        }
        if let Some(venv) = &record.venv {
            modes.push(format!("venv:{}", venv));
        }
        let modes = if modes.is_empty() {
            String::new()
        } else {
            format!("  ({})", modes.join(", "))
        };

        println!("{}{}", name.bright_white().bold(), modes.cyan());
        if !record.description.is_empty() {
            println!("  {}", record.description.bright_black());
        }
        for command in &record.commands {
            println!("  {} {}", "►".bright_black(), command);
        }
    }
    Ok(())
}
