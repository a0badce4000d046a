//! The fan-out execution engine.
//!
//! Turns raw command templates plus the manifest tables into one ready-to-exec
//! argv per targeted repository, chdir-ing into each repository while its item
//! is being produced. Running the argv is the caller's job (`commands::apply`).

use std::path::PathBuf;

mod driver;
mod params;
mod scope;
mod template;
mod wrap;

pub use driver::Fanout;
pub use params::{resolve, EnvSnapshot};
pub use scope::DirGuard;
pub use template::{substitute, substitute_all};
pub use wrap::{system_shell, wrap, WrapMode};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("template '{template}' references missing parameter '{key}'")]
    MissingParameter { key: String, template: String },

    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    #[error("repository directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("failed to tokenize command: {0}")]
    CommandParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
