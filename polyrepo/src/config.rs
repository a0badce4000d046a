use anyhow::Result;
use polyrepo_core::{Manifest, RuntimeConfig};

pub fn create_runtime_config() -> Result<RuntimeConfig> {
    let working_dir = std::env::current_dir()?;
    let manifest_path = Manifest::find_manifest_file();

    let manifest = match &manifest_path {
        Some(path) => Manifest::load_from_file(path)?,
        None => Manifest::default(),
    };

    Ok(RuntimeConfig {
        manifest,
        working_dir,
        manifest_path,
    })
}
