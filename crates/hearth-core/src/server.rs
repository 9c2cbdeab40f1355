use crate::library::Core;
use crate::EngineHome;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Query and update handle to the running engine's core.
///
/// One handle is shared by every caller; it is never re-created while the
/// engine runs.
pub struct SearchServer {
    home: EngineHome,
    core: Arc<dyn Core>,
    core_names: Vec<String>,
}

impl SearchServer {
    pub fn new(home: EngineHome, core: Arc<dyn Core>, core_names: Vec<String>) -> Self {
        Self {
            home,
            core,
            core_names,
        }
    }

    pub fn core_name(&self) -> &str {
        self.core.name()
    }

    pub fn core(&self) -> &Arc<dyn Core> {
        &self.core
    }

    pub fn core_names(&self) -> &[String] {
        &self.core_names
    }

    pub fn home(&self) -> &Path {
        self.home.root()
    }

    pub fn data_dir(&self) -> &Path {
        self.core.data_dir()
    }

    /// False once the engine has been stopped.
    pub fn is_available(&self) -> bool {
        !self.core.is_closed()
    }
}

impl fmt::Debug for SearchServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchServer")
            .field("home", &self.home)
            .field("core", &self.core.name())
            .field("core_names", &self.core_names)
            .finish()
    }
}
