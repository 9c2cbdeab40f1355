//! Bootstrap and lifecycle management for the embedded search engine.
//!
//! `EngineLifecycle` is the entry point: `start()` makes sure the engine's
//! logging configuration exists, then runs the `EngineBootstrapper`, which
//! stages default files into the engine home, resolves the config and schema
//! documents, and assembles a container with a single registered core. The
//! resulting `SearchServer` handle is shared with every caller until `stop()`
//! closes the core and shuts the container down.
//!
//! The search engine itself sits behind the `EngineLibrary` trait.

pub mod bootstrap;
pub mod concurrency;
pub mod home;
pub mod library;
pub mod lifecycle;
pub mod mock;
pub mod server;
pub mod settings;

pub use bootstrap::{
    BootstrapError, EngineBootstrapper, EngineInstance, CONTAINER_DESCRIPTOR, CORE_NAME,
};
pub use concurrency::{install_signal_handler, shutdown_requested, HomeLock};
pub use home::EngineHome;
pub use library::{
    select_library, Core, CoreContainer, EngineConfig, EngineError, EngineLibrary, IndexSchema,
    ResourceLoader,
};
pub use lifecycle::{validate_transition, EngineLifecycle, LifecycleState};
pub use server::SearchServer;
pub use settings::EngineSettings;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("config store error: {0}")]
    ConfigStore(#[from] hearth_config::ConfigStoreError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("engine is not running")]
    NotReady,
    #[error("engine has already been stopped")]
    AlreadyStopped,
    #[error("engine shutdown reported an error: {0}")]
    Shutdown(#[source] EngineError),
    #[error("settings error: {0}")]
    Settings(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
