use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name of the project manifest, stored at the project root.
pub const MANIFEST_FILE: &str = ".polyrepo";

/// One tracked child repository. The repository name is the key of the
/// `repos` table, not a field of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRecord {
    #[serde(default)]
    pub url: Option<String>,
    pub path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Exactly one record per manifest carries this flag, and its `path`
    /// must resolve to the project root.
    #[serde(default)]
    pub is_metarepo: bool,
    #[serde(default = "default_vcs")]
    pub vcs: String,
}

fn default_vcs() -> String {
    "git".to_string()
}

impl RepoRecord {
    pub fn new(url: Option<String>, path: impl Into<String>) -> Self {
        Self {
            url,
            path: path.into(),
            tags: Vec::new(),
            is_metarepo: false,
            vcs: default_vcs(),
        }
    }

    pub fn metarepo() -> Self {
        Self {
            url: None,
            path: ".".to_string(),
            tags: Vec::new(),
            is_metarepo: true,
            vcs: default_vcs(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A stored, reusable command template. `commands` entries may contain
/// `{name}` placeholders resolved per repository at apply time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub commands: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub shell: bool,
    #[serde(default)]
    pub python: bool,
    #[serde(default)]
    pub venv: Option<String>,
    #[serde(default = "default_true")]
    pub raise_errors: bool,
}

fn default_true() -> bool {
    true
}

impl CommandRecord {
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            description: String::new(),
            tags: Vec::new(),
            repositories: Vec::new(),
            all: false,
            verbose: false,
            shell: false,
            python: false,
            venv: None,
            raise_errors: true,
        }
    }
}

/// The `.polyrepo` manifest. All tables preserve insertion order, which is
/// also the fan-out iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub repos: IndexMap<String, RepoRecord>,
    #[serde(default)]
    pub commands: IndexMap<String, CommandRecord>,
    #[serde(default)]
    pub constants: IndexMap<String, Value>,
    #[serde(default)]
    pub virtualenvs: IndexMap<String, PathBuf>,
}

impl Manifest {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Walk up from the current directory looking for a manifest file.
    pub fn find_manifest_file() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let manifest = current.join(MANIFEST_FILE);
            if manifest.exists() {
                return Some(manifest);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    pub fn load() -> Result<Self> {
        if let Some(manifest) = Self::find_manifest_file() {
            Self::load_from_file(manifest)
        } else {
            Err(anyhow::anyhow!("No .polyrepo manifest found"))
        }
    }

    /// The repository record flagged as the primary metarepo, if any.
    pub fn primary(&self) -> Option<(&String, &RepoRecord)> {
        self.repos.iter().find(|(_, r)| r.is_metarepo)
    }

    pub fn repo_exists(&self, name: &str) -> bool {
        self.repos.contains_key(name)
    }

    /// Insert or replace a repository record, rejecting a second primary
    /// metarepo entry.
    pub fn insert_repo(&mut self, name: String, record: RepoRecord) -> Result<()> {
        if record.is_metarepo {
            if let Some((existing, _)) = self.primary() {
                if existing != &name {
                    return Err(anyhow::anyhow!(
                        "Manifest already has a primary metarepo record: '{}'",
                        existing
                    ));
                }
            }
        }
        self.repos.insert(name, record);
        Ok(())
    }

    /// Names of repositories carrying any of the given tags, in table order.
    pub fn repos_with_tags(&self, tags: &[String]) -> Vec<String> {
        self.repos
            .iter()
            .filter(|(_, r)| tags.iter().any(|t| r.has_tag(t)))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Runtime configuration handed to every command handler.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub manifest: Manifest,
    pub working_dir: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn has_manifest(&self) -> bool {
        self.manifest_path.is_some()
    }

    /// The project root: the directory containing the manifest file.
    pub fn root(&self) -> Option<PathBuf> {
        self.manifest_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn save(&self) -> Result<()> {
        let path = self
            .manifest_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No .polyrepo manifest found. Run 'poly init' first."))?;
        self.manifest.save_to_file(path)
    }
}
