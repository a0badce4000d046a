//! Constants and virtualenv table management.

use anyhow::Result;
use colored::*;
use polyrepo_core::RuntimeConfig;
use serde_json::Value;
use std::path::PathBuf;

/// Set a project constant. Values parse as JSON scalars where possible
/// (`42`, `1.5`, `true`), otherwise they are stored as strings.
pub fn const_set(config: &mut RuntimeConfig, name: &str, raw: &str) -> Result<()> {
    let bare = name.strip_prefix('$').unwrap_or(name);
    if bare.is_empty() || bare != bare.to_uppercase() {
        return Err(anyhow::anyhow!(
            "Constant names are uppercase (optionally $-prefixed): '{}'",
            name
        ));
    }

    let value = match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(raw.to_string()),
    };

    config.manifest.constants.insert(name.to_string(), value);
    config.save()?;

    println!("Set {}", name);
    Ok(())
}

pub fn const_remove(config: &mut RuntimeConfig, name: &str) -> Result<()> {
    if config.manifest.constants.shift_remove(name).is_none() {
        return Err(anyhow::anyhow!("No constant named '{}'", name));
    }
    config.save()?;

    println!("Removed {}", name);
    Ok(())
}

pub fn const_list(config: &RuntimeConfig) -> Result<()> {
    if config.manifest.constants.is_empty() {
        println!("No constants set.");
        return Ok(());
    }
    for (name, value) in &config.manifest.constants {
        println!("{} {} {}", name.bright_white().bold(), "=".bright_black(), value);
    }
    Ok(())
}

pub fn venv_add(config: &mut RuntimeConfig, name: &str, path: &str) -> Result<()> {
    let path = PathBuf::from(path);
    if !path.is_absolute() {
        return Err(anyhow::anyhow!("Virtualenv paths must be absolute"));
    }
    if !path.join("bin/activate").exists() {
        eprintln!(
            "{} {} has no bin/activate script",
            "warning:".yellow(),
            path.display()
        );
    }

    config.manifest.virtualenvs.insert(name.to_string(), path);
    config.save()?;

    println!("Registered virtualenv '{}'", name);
    Ok(())
}

pub fn venv_remove(config: &mut RuntimeConfig, name: &str) -> Result<()> {
    if config.manifest.virtualenvs.shift_remove(name).is_none() {
        return Err(anyhow::anyhow!("No virtualenv named '{}'", name));
    }
    config.save()?;

    println!("Unregistered virtualenv '{}'", name);
    Ok(())
}

pub fn venv_list(config: &RuntimeConfig) -> Result<()> {
    if config.manifest.virtualenvs.is_empty() {
        println!("No virtualenvs registered.");
        return Ok(());
    }
    for (name, path) in &config.manifest.virtualenvs {
        println!(
            "{} {} {}",
            name.bright_white().bold(),
            "→".bright_black(),
            path.display()
        );
    }
    Ok(())
}
