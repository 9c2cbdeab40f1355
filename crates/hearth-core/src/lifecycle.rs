use crate::bootstrap::{EngineBootstrapper, EngineInstance};
use crate::library::EngineLibrary;
use crate::server::SearchServer;
use crate::settings::EngineSettings;
use crate::{CoreError, EngineHome};
use hearth_config::{ConfigStore, LoggingConfigRegistrar};
use hearth_resource::ResourceResolver;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    /// Logging registration and bootstrap are in progress.
    Starting,
    Running,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Uninitialized => write!(f, "uninitialized"),
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (LifecycleState::Uninitialized, LifecycleState::Starting)
            | (LifecycleState::Starting, LifecycleState::Running)
            | (LifecycleState::Starting, LifecycleState::Uninitialized)
            | (LifecycleState::Running, LifecycleState::Stopped)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

struct Inner {
    state: LifecycleState,
    home: Option<PathBuf>,
    instance: Option<EngineInstance>,
}

/// Owns one embedded engine from start to stop.
///
/// A lifecycle runs at most once: `Uninitialized -> Starting -> Running ->
/// Stopped`. A failed start falls back from `Starting` to `Uninitialized`.
/// The state mutex is never held across registration or bootstrap, so handle
/// accessors answer immediately from any thread while a start is underway.
pub struct EngineLifecycle {
    library: Arc<dyn EngineLibrary>,
    resolver: Arc<ResourceResolver>,
    config_store: Arc<dyn ConfigStore>,
    inner: Mutex<Inner>,
}

impl EngineLifecycle {
    pub fn new(
        library: Arc<dyn EngineLibrary>,
        resolver: Arc<ResourceResolver>,
        config_store: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            library,
            resolver,
            config_store,
            inner: Mutex::new(Inner {
                state: LifecycleState::Uninitialized,
                home: None,
                instance: None,
            }),
        }
    }

    /// The state lock. Poisoning is ignored: no update of `Inner` can panic
    /// partway through.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ensure the logging configuration exists, then bootstrap the engine.
    ///
    /// On failure the lifecycle returns to `Uninitialized` and no handle is
    /// published. A concurrent second `start` is rejected while this one is
    /// `Starting`.
    pub fn start(&self, settings: &EngineSettings) -> Result<Arc<SearchServer>, CoreError> {
        {
            let mut inner = self.lock();
            validate_transition(inner.state, LifecycleState::Starting)?;
            inner.state = LifecycleState::Starting;
        }

        match self.bring_up(settings) {
            Ok((home, instance)) => {
                let server = instance.server();
                let mut inner = self.lock();
                validate_transition(inner.state, LifecycleState::Running)?;
                inner.home = Some(home.root().to_path_buf());
                inner.instance = Some(instance);
                inner.state = LifecycleState::Running;
                info!("engine running in {}", home.root().display());
                Ok(server)
            }
            Err(e) => {
                self.lock().state = LifecycleState::Uninitialized;
                Err(e)
            }
        }
    }

    fn bring_up(
        &self,
        settings: &EngineSettings,
    ) -> Result<(EngineHome, EngineInstance), CoreError> {
        let logging = LoggingConfigRegistrar::new(self.config_store.as_ref())
            .ensure_logging_config()?;
        debug!(
            "engine logging configuration {} (created: {})",
            logging.record().pid,
            logging.was_created()
        );

        let home = EngineHome::absolute(settings.resolve_home())?;
        let bootstrapper =
            EngineBootstrapper::new(Arc::clone(&self.library), Arc::clone(&self.resolver));
        let instance = bootstrapper.bootstrap(
            &home,
            &settings.schema_location,
            &settings.config_location,
        )?;
        Ok((home, instance))
    }

    /// Close the core and shut the container down.
    ///
    /// The lifecycle ends `Stopped` even when teardown reports an error.
    pub fn stop(&self) -> Result<(), CoreError> {
        let mut inner = self.lock();
        validate_transition(inner.state, LifecycleState::Stopped)?;

        inner.state = LifecycleState::Stopped;
        let Some(mut instance) = inner.instance.take() else {
            return Ok(());
        };
        instance.shutdown().map_err(CoreError::Shutdown)
    }

    /// The shared query handle.
    pub fn server(&self) -> Result<Arc<SearchServer>, CoreError> {
        let inner = self.lock();
        match inner.state {
            LifecycleState::Uninitialized | LifecycleState::Starting => Err(CoreError::NotReady),
            LifecycleState::Stopped => Err(CoreError::AlreadyStopped),
            LifecycleState::Running => inner
                .instance
                .as_ref()
                .map(EngineInstance::server)
                .ok_or(CoreError::NotReady),
        }
    }

    /// The shared update handle. Same object as `server()`.
    pub fn update_server(&self) -> Result<Arc<SearchServer>, CoreError> {
        self.server()
    }

    /// The engine home chosen at startup.
    pub fn home(&self) -> Result<PathBuf, CoreError> {
        self.lock().home.clone().ok_or(CoreError::NotReady)
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }
}

impl fmt::Debug for EngineLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLifecycle")
            .field("library", &self.library.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
