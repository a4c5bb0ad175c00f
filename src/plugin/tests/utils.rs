//! Plugin Test Utilities
//!
//! In-process mock modules driven by a [`MockSpec`]. Every call into plugin
//! code is appended to a shared event log so tests can assert on ordering.

use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::manager::{ManagerSettings, PluginManager};
use crate::plugin::traits::{BoxError, ModuleLoader, PluginInstance, PluginModule};
use crate::plugin::types::ModuleCapabilities;
use crate::plugin::worker::WorkerContext;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Artifact suffix used by the mock fixtures
pub const MOCK_PATTERN: &str = "*.plugin";

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// How a mocked entry point behaves when called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

impl Behavior {
    fn run(self, what: &str) -> Result<(), BoxError> {
        match self {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(format!("{} failed", what).into()),
            Behavior::Panic => panic!("{} exploded", what),
        }
    }
}

/// Shape of one mock plugin module
#[derive(Debug, Clone)]
pub struct MockSpec {
    pub installer: Option<Behavior>,
    pub factory: Option<Behavior>,
    pub needs_worker: bool,
    pub start: Behavior,
    pub cleanup: Behavior,
    pub start_delay: Option<Duration>,
}

impl MockSpec {
    /// Installer and factory present, no worker
    pub fn plain() -> Self {
        Self {
            installer: Some(Behavior::Succeed),
            factory: Some(Behavior::Succeed),
            needs_worker: false,
            start: Behavior::Succeed,
            cleanup: Behavior::Succeed,
            start_delay: None,
        }
    }

    /// Like `plain` but the instance asks for a dedicated worker
    pub fn worker() -> Self {
        Self {
            needs_worker: true,
            ..Self::plain()
        }
    }

    pub fn installer(mut self, behavior: Option<Behavior>) -> Self {
        self.installer = behavior;
        self
    }

    pub fn factory(mut self, behavior: Option<Behavior>) -> Self {
        self.factory = behavior;
        self
    }

    pub fn start(mut self, behavior: Behavior) -> Self {
        self.start = behavior;
        self
    }

    pub fn cleanup(mut self, behavior: Behavior) -> Self {
        self.cleanup = behavior;
        self
    }

    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }
}

fn record(log: &EventLog, event: String) {
    log.lock().unwrap().push(event);
}

/// Loader that hands out mock modules keyed by module name
pub struct MockLoader {
    specs: Arc<Mutex<HashMap<String, MockSpec>>>,
    log: EventLog,
}

impl ModuleLoader for MockLoader {
    fn load(&self, module_name: &str, artifact: &Path) -> PluginResult<Box<dyn PluginModule>> {
        record(&self.log, format!("load:{}", module_name));
        let spec = self
            .specs
            .lock()
            .unwrap()
            .get(module_name)
            .cloned()
            .ok_or_else(|| PluginError::LoadFailed {
                artifact: artifact.to_path_buf(),
                cause: "unknown mock module".to_string(),
            })?;
        Ok(Box::new(MockModule {
            name: module_name.to_string(),
            spec,
            log: self.log.clone(),
        }))
    }

    fn add_search_path(&self, dir: &Path) {
        record(&self.log, format!("search:{}", dir.display()));
    }
}

struct MockModule {
    name: String,
    spec: MockSpec,
    log: EventLog,
}

impl PluginModule for MockModule {
    fn capabilities(&self) -> ModuleCapabilities {
        ModuleCapabilities {
            installer: self.spec.installer.is_some(),
            factory: self.spec.factory.is_some(),
        }
    }

    fn register_types(&self) -> Result<(), BoxError> {
        record(&self.log, format!("register:{}", self.name));
        self.spec
            .installer
            .unwrap_or(Behavior::Succeed)
            .run("register_types")
    }

    fn create_instance(&self) -> Result<Box<dyn PluginInstance>, BoxError> {
        record(&self.log, format!("create:{}", self.name));
        self.spec
            .factory
            .unwrap_or(Behavior::Succeed)
            .run("create_instance")?;
        Ok(Box::new(MockInstance {
            name: self.name.clone(),
            spec: self.spec.clone(),
            log: self.log.clone(),
        }))
    }
}

impl Drop for MockModule {
    fn drop(&mut self) {
        record(&self.log, format!("unload:{}", self.name));
    }
}

pub struct MockInstance {
    name: String,
    spec: MockSpec,
    log: EventLog,
}

impl PluginInstance for MockInstance {
    fn needs_dedicated_worker(&self) -> bool {
        self.spec.needs_worker
    }

    fn start_thread(&mut self, ctx: &WorkerContext) -> Result<(), BoxError> {
        let on_thread = std::thread::current().name().unwrap_or("?").to_string();
        record(&self.log, format!("start:{}@{}", self.name, on_thread));
        if let Some(delay) = self.spec.start_delay {
            std::thread::sleep(delay);
        }
        assert_eq!(ctx.plugin_path().file_name().unwrap(), self.name.as_str());
        self.spec.start.run("start_thread")
    }

    fn cleanup(&mut self) -> Result<(), BoxError> {
        record(&self.log, format!("cleanup:{}", self.name));
        self.spec.cleanup.run("cleanup")
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        record(&self.log, format!("drop:{}", self.name));
    }
}

/// Temporary plugin tree plus the mock loader state behind it
pub struct Fixture {
    pub root: TempDir,
    pub log: EventLog,
    specs: Arc<Mutex<HashMap<String, MockSpec>>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            log: Arc::new(Mutex::new(Vec::new())),
            specs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.root.path().join("modules").join(name)
    }

    /// Plugin directory containing a matching artifact
    pub fn add_plugin(&self, name: &str, spec: MockSpec) -> PathBuf {
        let dir = self.add_empty_plugin(name, spec);
        self.place_artifact(&dir);
        dir
    }

    /// Plugin known to the loader whose directory holds no artifact yet
    pub fn add_empty_plugin(&self, name: &str, spec: MockSpec) -> PathBuf {
        let dir = self.plugin_dir(name);
        std::fs::create_dir_all(&dir).unwrap();
        self.set_spec(name, spec);
        dir
    }

    pub fn place_artifact(&self, dir: &Path) {
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        std::fs::write(dir.join(format!("{}.plugin", name)), b"mock").unwrap();
    }

    pub fn set_spec(&self, name: &str, spec: MockSpec) {
        self.specs.lock().unwrap().insert(name.to_string(), spec);
    }

    pub fn settings(&self, worker_stop_timeout: Option<Duration>) -> ManagerSettings {
        ManagerSettings {
            artifact_patterns: vec![MOCK_PATTERN.to_string()],
            worker_stop_timeout,
        }
    }

    pub fn manager(&self) -> PluginManager {
        self.manager_with_timeout(Some(Duration::from_secs(5)))
    }

    pub fn manager_with_timeout(&self, worker_stop_timeout: Option<Duration>) -> PluginManager {
        PluginManager::with_loader(
            self.settings(worker_stop_timeout),
            Box::new(MockLoader {
                specs: self.specs.clone(),
                log: self.log.clone(),
            }),
        )
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Events whose kind is one of `kinds`, e.g. `["create", "cleanup"]`
    pub fn events_of(&self, kinds: &[&str]) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| {
                event
                    .split_once(':')
                    .is_some_and(|(kind, _)| kinds.contains(&kind))
            })
            .collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn clear_events(&self) {
        self.log.lock().unwrap().clear();
    }
}
