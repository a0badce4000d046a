pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;

pub use cli::PolyCli;
pub use config::create_runtime_config;
pub use engine::{DirGuard, EngineError, EnvSnapshot, Fanout, WrapMode};
pub use polyrepo_core::{CommandRecord, Manifest, RepoRecord, RuntimeConfig};
