//! Repository-management commands: the thin layer maintaining the manifest's
//! repository table. The engine only ever reads what these write.

use anyhow::Result;
use colored::*;
use polyrepo_core::{Manifest, RepoRecord, RuntimeConfig, MANIFEST_FILE};

/// Create a manifest at the current directory with the primary metarepo
/// record pointing at it.
pub fn init(config: &RuntimeConfig) -> Result<()> {
    if config.has_manifest() {
        return Err(anyhow::anyhow!(
            "A .polyrepo manifest already governs this directory"
        ));
    }

    let mut manifest = Manifest::default();
    manifest.insert_repo("metarepo".to_string(), RepoRecord::metarepo())?;

    let path = config.working_dir.join(MANIFEST_FILE);
    manifest.save_to_file(&path)?;

    println!("Initialized {}", path.display());
    Ok(())
}

pub fn add(
    config: &mut RuntimeConfig,
    name: &str,
    url: Option<String>,
    path: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    if config.manifest.repo_exists(name) {
        return Err(anyhow::anyhow!("Repository '{}' is already tracked", name));
    }

    let mut record = RepoRecord::new(url, path.unwrap_or_else(|| name.to_string()));
    record.tags = tags;
    config.manifest.insert_repo(name.to_string(), record)?;
    config.save()?;

    println!("Tracking '{}'", name);
    Ok(())
}

pub fn remove(config: &mut RuntimeConfig, name: &str) -> Result<()> {
    match config.manifest.repos.get(name) {
        Some(record) if record.is_metarepo => Err(anyhow::anyhow!(
            "Refusing to remove the primary metarepo record"
        )),
        Some(_) => {
            config.manifest.repos.shift_remove(name);
            config.save()?;
            println!("Stopped tracking '{}'", name);
            Ok(())
        }
        None => Err(anyhow::anyhow!("Repository '{}' is not tracked", name)),
    }
}

pub fn list(config: &RuntimeConfig) -> Result<()> {
    if config.manifest.repos.is_empty() {
        println!("No repositories tracked. Use 'poly repo add'.");
        return Ok(());
    }

    for (name, record) in &config.manifest.repos {
        let marker = if record.is_metarepo { "*" } else { " " };
        let tags = if record.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", record.tags.join(", "))
        };
        println!(
            "{} {}  {} {}{}",
            marker,
            name.bright_white().bold(),
            record.path.bright_black(),
            record.url.as_deref().unwrap_or("-").bright_black(),
            tags.cyan()
        );
    }
    Ok(())
}

pub fn tag(config: &mut RuntimeConfig, name: &str, tags: &[String]) -> Result<()> {
    let record = config
        .manifest
        .repos
        .get_mut(name)
        .ok_or_else(|| anyhow::anyhow!("Repository '{}' is not tracked", name))?;

    for tag in tags {
        if !record.has_tag(tag) {
            record.tags.push(tag.clone());
        }
    }
    config.save()?;

    println!("Tagged '{}' with {}", name, tags.join(", "));
    Ok(())
}

pub fn untag(config: &mut RuntimeConfig, name: &str, tags: &[String]) -> Result<()> {
    let record = config
        .manifest
        .repos
        .get_mut(name)
        .ok_or_else(|| anyhow::anyhow!("Repository '{}' is not tracked", name))?;

    record.tags.retain(|t| !tags.contains(t));
    config.save()?;

    println!("Untagged '{}'", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> RuntimeConfig {
        let path = dir.join(MANIFEST_FILE);
        let mut manifest = Manifest::default();
        manifest
            .insert_repo("metarepo".to_string(), RepoRecord::metarepo())
            .unwrap();
        manifest.save_to_file(&path).unwrap();
        RuntimeConfig {
            manifest,
            working_dir: dir.to_path_buf(),
            manifest_path: Some(path),
        }
    }

    #[test]
    fn test_add_and_remove() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());

        add(
            &mut config,
            "genisys",
            Some("https://example.com/genisys.git".to_string()),
            Some("core/genisys".to_string()),
            vec!["core".to_string()],
        )
        .unwrap();
        assert!(config.manifest.repo_exists("genisys"));
        assert!(add(&mut config, "genisys", None, None, vec![]).is_err());

        remove(&mut config, "genisys").unwrap();
        assert!(!config.manifest.repo_exists("genisys"));

        let reloaded = Manifest::load_from_file(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(!reloaded.repo_exists("genisys"));
    }

    #[test]
    fn test_primary_metarepo_cannot_be_removed() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());

        assert!(remove(&mut config, "metarepo").is_err());
        assert!(config.manifest.repo_exists("metarepo"));
    }

    #[test]
    fn test_tag_and_untag() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        add(&mut config, "api", None, None, vec![]).unwrap();

        tag(&mut config, "api", &["backend".to_string(), "prod".to_string()]).unwrap();
        tag(&mut config, "api", &["backend".to_string()]).unwrap();
        assert_eq!(
            config.manifest.repos.get("api").unwrap().tags,
            vec!["backend", "prod"]
        );

        untag(&mut config, "api", &["prod".to_string()]).unwrap();
        assert_eq!(config.manifest.repos.get("api").unwrap().tags, vec!["backend"]);
    }

    #[test]
    fn test_init_refuses_existing_manifest() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(init(&config).is_err());
    }
}
