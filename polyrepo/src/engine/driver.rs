//! The fan-out driver: a lazy walk over the selected repositories.
//!
//! Each `next()` produces one `(repo_name, argv)` pair, with the process
//! cwd inside that repository until the following `next()` (or until the
//! iterator is dropped). A fresh `Fanout` is required per apply call; an
//! exhausted one cannot be replayed.

use super::{params, scope::DirGuard, template, wrap, EngineError, EnvSnapshot, WrapMode};
use indexmap::IndexMap;
use polyrepo_core::{Manifest, RepoRecord};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

pub struct Fanout {
    root: PathBuf,
    selected: Vec<(String, RepoRecord)>,
    all_repos: IndexMap<String, RepoRecord>,
    constants: IndexMap<String, Value>,
    env: EnvSnapshot,
    commands: Vec<String>,
    mode: WrapMode,
    shell_path: String,
    cursor: usize,
    // Held across the yield so the caller observes each item from inside
    // its repository; dropped on the next advance or when the iterator is
    // abandoned, restoring the original cwd either way.
    guard: Option<DirGuard>,
}

impl Fanout {
    /// Select `targets` (exact name membership, manifest insertion order)
    /// and prepare a fresh fan-out. Callers resolve their own default
    /// target set before constructing the driver.
    pub fn new(
        manifest: &Manifest,
        root: PathBuf,
        commands: Vec<String>,
        targets: &[String],
        mode: WrapMode,
        env: EnvSnapshot,
    ) -> Self {
        let selected = manifest
            .repos
            .iter()
            .filter(|(name, _)| targets.iter().any(|t| &t == name))
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect();

        Self {
            root,
            selected,
            all_repos: manifest.repos.clone(),
            constants: manifest.constants.clone(),
            env,
            commands,
            mode,
            shell_path: wrap::system_shell(),
            cursor: 0,
            guard: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.selected.len() - self.cursor
    }

    fn produce(&mut self, name: &str, record: &RepoRecord) -> Result<Vec<String>, EngineError> {
        let guard = DirGuard::change(&self.root, &record.path)?;

        let params = params::resolve(
            name,
            record,
            &self.all_repos,
            &self.constants,
            &self.env,
            self.mode.python,
        );
        let resolved = template::substitute_all(&self.commands, &params)?;
        let argv = wrap::wrap(&resolved, &self.mode, &self.shell_path)?;

        debug!("prepared {} -> {:?}", name, argv);
        self.guard = Some(guard);
        Ok(argv)
    }
}

impl Iterator for Fanout {
    type Item = Result<(String, Vec<String>), EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        // Restore the previous repository's cwd before advancing.
        self.guard.take();

        let (name, record) = self.selected.get(self.cursor)?.clone();
        self.cursor += 1;

        match self.produce(&name, &record) {
            Ok(argv) => Some(Ok((name, argv))),
            Err(e) => Some(Err(e)),
        }
    }
}
