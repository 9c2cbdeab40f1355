//! Resource resolution and default file staging for the Hearth engine bootstrap.
//!
//! This crate locates configuration and schema documents through an ordered
//! chain of strategies (URL, filesystem path, bundled default), and stages the
//! defaults compiled into the binary into an engine home directory without
//! overwriting files an operator has already customized.

pub mod bundle;
pub mod deploy;
pub mod resolver;

pub use bundle::Bundle;
pub use deploy::{DefaultFileDeployer, DeployOutcome};
pub use resolver::{HttpFetcher, Resource, ResourceResolver, Strategy, UrlFetcher};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource '{name}' not found (tried {})", resolver::format_strategies(.attempted))]
    NotFound {
        name: String,
        attempted: Vec<Strategy>,
    },
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("no bundled default named '{0}'")]
    MissingDefault(String),
    #[error("failed to deploy '{}': {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
