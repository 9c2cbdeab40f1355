use crate::bootstrap::CONTAINER_DESCRIPTOR;
use crate::library::{
    Core, CoreContainer, EngineConfig, EngineError, EngineLibrary, IndexSchema, ResourceLoader,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Something the mock library was asked to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    ContainerCreated(PathBuf),
    ConfigParsed(String),
    SchemaParsed(String),
    CoreOpened(String),
    CoreRegistered(String),
    CoreClosed(String),
    ContainerShutdown,
}

/// Step at which the mock library reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateContainer,
    OpenCore,
    Register,
    CloseCore,
    Shutdown,
}

type EventLog = Arc<Mutex<Vec<LibraryEvent>>>;

fn record(log: &EventLog, event: LibraryEvent) {
    if let Ok(mut events) = log.lock() {
        events.push(event);
    }
}

fn read_document(stream: &mut dyn Read) -> Result<String, EngineError> {
    let mut document = String::new();
    stream.read_to_string(&mut document)?;
    Ok(document)
}

/// In-process stand-in for the search engine.
///
/// Performs the same structural checks a real engine would make on its inputs
/// and records every call so tests can assert on ordering.
#[derive(Default)]
pub struct MockLibrary {
    events: EventLog,
    fail_at: Option<FailPoint>,
}

impl MockLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing_at(mut self, point: FailPoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    pub fn events(&self) -> Vec<LibraryEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn fails(&self, point: FailPoint) -> bool {
        self.fail_at == Some(point)
    }
}

impl EngineLibrary for MockLibrary {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn create_container(
        &self,
        loader: ResourceLoader,
    ) -> Result<Box<dyn CoreContainer>, EngineError> {
        if self.fails(FailPoint::CreateContainer) {
            return Err(EngineError::Container("injected failure".to_owned()));
        }
        let descriptor = loader.home().descriptor_path(CONTAINER_DESCRIPTOR);
        if !descriptor.is_file() {
            return Err(EngineError::Container(format!(
                "container descriptor {} missing",
                descriptor.display()
            )));
        }
        record(
            &self.events,
            LibraryEvent::ContainerCreated(loader.home().root().to_path_buf()),
        );
        Ok(Box::new(MockContainer {
            cores: BTreeMap::new(),
            events: Arc::clone(&self.events),
            fail_register: self.fails(FailPoint::Register),
            fail_shutdown: self.fails(FailPoint::Shutdown),
            shut_down: false,
        }))
    }

    fn parse_config(
        &self,
        _loader: &ResourceLoader,
        name: &str,
        stream: &mut dyn Read,
    ) -> Result<EngineConfig, EngineError> {
        let document = read_document(stream)?;
        if !document.contains("<config") {
            return Err(EngineError::InvalidConfig {
                name: name.to_owned(),
                reason: "missing <config> root element".to_owned(),
            });
        }
        record(&self.events, LibraryEvent::ConfigParsed(name.to_owned()));
        Ok(EngineConfig {
            name: name.to_owned(),
            document,
        })
    }

    fn parse_schema(
        &self,
        _config: &EngineConfig,
        name: &str,
        stream: &mut dyn Read,
    ) -> Result<IndexSchema, EngineError> {
        let document = read_document(stream)?;
        if !document.contains("<schema") {
            return Err(EngineError::InvalidSchema {
                name: name.to_owned(),
                reason: "missing <schema> root element".to_owned(),
            });
        }
        record(&self.events, LibraryEvent::SchemaParsed(name.to_owned()));
        Ok(IndexSchema {
            name: name.to_owned(),
            document,
        })
    }

    fn open_core(
        &self,
        name: &str,
        data_dir: PathBuf,
        _config: EngineConfig,
        _schema: IndexSchema,
    ) -> Result<Arc<dyn Core>, EngineError> {
        if self.fails(FailPoint::OpenCore) {
            return Err(EngineError::Core {
                name: name.to_owned(),
                reason: "injected failure".to_owned(),
            });
        }
        std::fs::create_dir_all(&data_dir)?;
        record(&self.events, LibraryEvent::CoreOpened(name.to_owned()));
        Ok(Arc::new(MockCore {
            name: name.to_owned(),
            data_dir,
            closed: AtomicBool::new(false),
            events: Arc::clone(&self.events),
            fail_close: self.fails(FailPoint::CloseCore),
        }))
    }
}

struct MockCore {
    name: String,
    data_dir: PathBuf,
    closed: AtomicBool,
    events: EventLog,
    fail_close: bool,
}

impl Core for MockCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), EngineError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        record(&self.events, LibraryEvent::CoreClosed(self.name.clone()));
        if self.fail_close {
            return Err(EngineError::Core {
                name: self.name.clone(),
                reason: "injected close failure".to_owned(),
            });
        }
        Ok(())
    }
}

struct MockContainer {
    cores: BTreeMap<String, Arc<dyn Core>>,
    events: EventLog,
    fail_register: bool,
    fail_shutdown: bool,
    shut_down: bool,
}

impl CoreContainer for MockContainer {
    fn register(&mut self, name: &str, core: Arc<dyn Core>) -> Result<(), EngineError> {
        if self.shut_down {
            return Err(EngineError::Container("container is shut down".to_owned()));
        }
        if self.fail_register {
            return Err(EngineError::Container(format!(
                "injected failure registering '{name}'"
            )));
        }
        if self.cores.contains_key(name) {
            return Err(EngineError::Container(format!(
                "core '{name}' already registered"
            )));
        }
        self.cores.insert(name.to_owned(), core);
        record(&self.events, LibraryEvent::CoreRegistered(name.to_owned()));
        Ok(())
    }

    fn core_names(&self) -> Vec<String> {
        self.cores.keys().cloned().collect()
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.cores.clear();
        record(&self.events, LibraryEvent::ContainerShutdown);
        if self.fail_shutdown {
            return Err(EngineError::Container("injected shutdown failure".to_owned()));
        }
        Ok(())
    }
}
