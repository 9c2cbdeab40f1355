use crate::EngineHome;
use hearth_resource::{Resource, ResourceError, ResourceResolver};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine library unavailable: {0}")]
    LibraryUnavailable(String),
    #[error("invalid engine config '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },
    #[error("invalid index schema '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },
    #[error("core '{name}' failed: {reason}")]
    Core { name: String, reason: String },
    #[error("container error: {0}")]
    Container(String),
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed engine configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub name: String,
    pub document: String,
}

/// Parsed index schema document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub document: String,
}

/// Loads auxiliary resources referenced by config and schema documents
/// (stopword lists, synonym files and the like).
///
/// Names are looked up under the engine home first, then through the shared
/// resolver. The loader is handed to the library explicitly; nothing about it
/// is process-global.
#[derive(Clone)]
pub struct ResourceLoader {
    home: EngineHome,
    resolver: Arc<ResourceResolver>,
}

impl ResourceLoader {
    pub fn new(home: EngineHome, resolver: Arc<ResourceResolver>) -> Self {
        Self { home, resolver }
    }

    pub fn home(&self) -> &EngineHome {
        &self.home
    }

    pub fn open(&self, name: &str) -> Result<Resource, ResourceError> {
        let local = self.home.root().join(name);
        if Path::new(name).is_relative() && local.is_file() {
            let local = local.to_string_lossy().into_owned();
            return self.resolver.resolve(&local);
        }
        self.resolver.resolve(name)
    }
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("home", &self.home)
            .finish_non_exhaustive()
    }
}

/// One opened search core.
pub trait Core: Send + Sync {
    fn name(&self) -> &str;

    fn data_dir(&self) -> &Path;

    fn is_closed(&self) -> bool;

    /// Close the core and release its index. Closing twice is a no-op.
    fn close(&self) -> Result<(), EngineError>;
}

/// Registry of open cores within one engine home.
pub trait CoreContainer: Send + Sync {
    fn register(&mut self, name: &str, core: Arc<dyn Core>) -> Result<(), EngineError>;

    /// Registered core names, sorted.
    fn core_names(&self) -> Vec<String>;

    fn shutdown(&mut self) -> Result<(), EngineError>;
}

/// The embedded search engine, as seen by the bootstrapper.
pub trait EngineLibrary: Send + Sync {
    fn name(&self) -> &str;

    fn create_container(&self, loader: ResourceLoader)
        -> Result<Box<dyn CoreContainer>, EngineError>;

    fn parse_config(
        &self,
        loader: &ResourceLoader,
        name: &str,
        stream: &mut dyn Read,
    ) -> Result<EngineConfig, EngineError>;

    fn parse_schema(
        &self,
        config: &EngineConfig,
        name: &str,
        stream: &mut dyn Read,
    ) -> Result<IndexSchema, EngineError>;

    fn open_core(
        &self,
        name: &str,
        data_dir: PathBuf,
        config: EngineConfig,
        schema: IndexSchema,
    ) -> Result<Arc<dyn Core>, EngineError>;
}

pub fn select_library(name: &str) -> Result<Arc<dyn EngineLibrary>, EngineError> {
    match name {
        "mock" => Ok(Arc::new(crate::mock::MockLibrary::new())),
        other => Err(EngineError::LibraryUnavailable(other.to_owned())),
    }
}
