use crate::concurrency::HomeLock;
use crate::library::{Core, CoreContainer, EngineError, EngineLibrary, ResourceLoader};
use crate::server::SearchServer;
use crate::EngineHome;
use hearth_resource::{DefaultFileDeployer, DeployError, ResourceError, ResourceResolver};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the single core the bootstrapper opens.
pub const CORE_NAME: &str = "nakamura";

/// Container descriptor staged into the engine home before startup.
pub const CONTAINER_DESCRIPTOR: &str = "solr.xml";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to stage defaults: {0}")]
    Deploy(#[from] DeployError),
    #[error("{0}")]
    Resource(#[from] ResourceError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("engine home {} is in use by another instance", .0.display())]
    HomeLocked(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Brings a container with one registered core up inside an engine home.
pub struct EngineBootstrapper {
    library: Arc<dyn EngineLibrary>,
    resolver: Arc<ResourceResolver>,
    deployer: DefaultFileDeployer,
}

impl EngineBootstrapper {
    pub fn new(library: Arc<dyn EngineLibrary>, resolver: Arc<ResourceResolver>) -> Self {
        let deployer = DefaultFileDeployer::new(resolver.bundle());
        Self {
            library,
            resolver,
            deployer,
        }
    }

    /// Run the full startup sequence.
    ///
    /// Any failure leaves nothing running: a core opened along the way is
    /// closed, the container is shut down, and the home lock is released.
    pub fn bootstrap(
        &self,
        home: &EngineHome,
        schema_location: &str,
        config_location: &str,
    ) -> Result<EngineInstance, BootstrapError> {
        let data_dir = home.core_dir(CORE_NAME);
        info!(
            "starting engine in {} (data dir {})",
            home.root().display(),
            data_dir.display()
        );

        self.deployer.deploy(home.root(), CONTAINER_DESCRIPTOR)?;

        let lock = HomeLock::try_acquire(&home.lock_file())?
            .ok_or_else(|| BootstrapError::HomeLocked(home.root().to_path_buf()))?;

        let loader = ResourceLoader::new(home.clone(), Arc::clone(&self.resolver));
        let mut container = self.library.create_container(loader.clone())?;

        match self.open_core(
            &loader,
            container.as_mut(),
            data_dir,
            schema_location,
            config_location,
        ) {
            Ok(core) => {
                let server = Arc::new(SearchServer::new(
                    home.clone(),
                    Arc::clone(&core),
                    container.core_names(),
                ));
                info!(
                    "engine started with {} core(s): {}",
                    server.core_names().len(),
                    server.core_names().join(", ")
                );
                Ok(EngineInstance {
                    home: home.clone(),
                    container,
                    core,
                    server,
                    lock: Some(lock),
                    stopped: false,
                })
            }
            Err(e) => {
                if let Err(shutdown_err) = container.shutdown() {
                    warn!("container shutdown after failed bootstrap: {shutdown_err}");
                }
                drop(lock);
                Err(e)
            }
        }
    }

    fn open_core(
        &self,
        loader: &ResourceLoader,
        container: &mut dyn CoreContainer,
        data_dir: PathBuf,
        schema_location: &str,
        config_location: &str,
    ) -> Result<Arc<dyn Core>, BootstrapError> {
        let mut config_stream = self.resolver.resolve(config_location)?;
        let mut schema_stream = self.resolver.resolve(schema_location)?;
        info!(
            "configuring with config {config_location} ({}) and schema {schema_location} ({})",
            config_stream.strategy(),
            schema_stream.strategy()
        );

        let config = self
            .library
            .parse_config(loader, config_location, &mut config_stream)?;
        let schema = self
            .library
            .parse_schema(&config, schema_location, &mut schema_stream)?;
        drop(config_stream);
        drop(schema_stream);

        let core = self.library.open_core(CORE_NAME, data_dir, config, schema)?;
        if let Err(e) = container.register(CORE_NAME, Arc::clone(&core)) {
            if let Err(close_err) = core.close() {
                warn!("closing unregistered core {CORE_NAME}: {close_err}");
            }
            return Err(e.into());
        }
        debug!("registered core {CORE_NAME}");
        Ok(core)
    }
}

/// Everything a running engine owns: the container, its core, the shared
/// server handle and the home lock.
///
/// Dropping an instance that was never shut down shuts it down.
pub struct EngineInstance {
    home: EngineHome,
    container: Box<dyn CoreContainer>,
    core: Arc<dyn Core>,
    server: Arc<SearchServer>,
    lock: Option<HomeLock>,
    stopped: bool,
}

impl EngineInstance {
    pub fn server(&self) -> Arc<SearchServer> {
        Arc::clone(&self.server)
    }

    pub fn home(&self) -> &Path {
        self.home.root()
    }

    pub fn core_names(&self) -> Vec<String> {
        self.container.core_names()
    }

    /// Close the core, then shut the container down.
    ///
    /// Both steps always run. The first failure is returned after teardown
    /// completes, and the home lock is released either way.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        let mut first_err = None;
        if let Err(e) = self.core.close() {
            warn!("closing core {}: {e}", self.core.name());
            first_err = Some(e);
        }
        if let Err(e) = self.container.shutdown() {
            warn!("shutting down container: {e}");
            first_err.get_or_insert(e);
        }
        self.lock.take();
        info!("engine in {} stopped", self.home.root().display());

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for EngineInstance {
    fn drop(&mut self) {
        if !self.stopped {
            let _ = self.shutdown();
        }
    }
}

impl fmt::Debug for EngineInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineInstance")
            .field("home", &self.home)
            .field("core", &self.core.name())
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}
