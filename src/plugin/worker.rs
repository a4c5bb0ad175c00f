//! Worker Supervisor
//!
//! Instances that ask for a dedicated worker are moved onto a named thread
//! through a command channel. From then on only that thread touches the
//! instance; the host reaches it by dispatching closures. Stopping a worker
//! hands the instance back so it can be cleaned up on the host side.

use crate::plugin::error::{panic_message, PluginError, PluginResult};
use crate::plugin::traits::PluginInstance;
use crate::plugin::types::module_base_name;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Closure executed on a worker against the instance it owns
pub type InstanceJob = Box<dyn FnOnce(&mut dyn PluginInstance) + Send>;

/// View of the worker handed to `PluginInstance::start_thread`
#[derive(Debug, Clone)]
pub struct WorkerContext {
    plugin_path: PathBuf,
    stop: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn plugin_path(&self) -> &Path {
        &self.plugin_path
    }

    /// True once the host has asked this worker to stop
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

enum WorkerCommand {
    Adopt(Box<dyn PluginInstance>),
    Invoke(InstanceJob),
    Stop,
}

/// Where an instance lives after `start_worker_if_needed`
pub enum Placement {
    /// No worker requested; the caller keeps the instance
    Local(Box<dyn PluginInstance>),
    /// Ownership moved to a freshly started worker
    OnWorker,
}

/// Failed worker start; the instance is returned untouched
pub struct WorkerStartError {
    pub error: PluginError,
    pub instance: Box<dyn PluginInstance>,
}

struct WorkerHandle {
    plugin_path: PathBuf,
    commands: Sender<WorkerCommand>,
    finished: Receiver<Box<dyn PluginInstance>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    started: bool,
}

/// Result of stopping one worker
pub struct StoppedWorker {
    pub plugin_path: PathBuf,
    /// The instance handed back, or why it could not be recovered
    pub outcome: PluginResult<Box<dyn PluginInstance>>,
    /// True if the thread may still be running plugin code
    pub detached: bool,
}

pub struct WorkerSupervisor {
    workers: Vec<WorkerHandle>,
    stop_timeout: Option<Duration>,
}

impl WorkerSupervisor {
    /// `stop_timeout` of `None` waits for workers indefinitely
    pub fn new(stop_timeout: Option<Duration>) -> Self {
        Self {
            workers: Vec::new(),
            stop_timeout,
        }
    }

    pub fn has_worker(&self, plugin_path: &Path) -> bool {
        self.workers.iter().any(|w| w.plugin_path == plugin_path)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Move `instance` onto a new worker if it asks for one.
    ///
    /// Returns as soon as the thread is spawned; `start_thread` runs on the
    /// worker without the caller waiting for it.
    pub fn start_worker_if_needed(
        &mut self,
        plugin_path: &Path,
        instance: Box<dyn PluginInstance>,
    ) -> Result<Placement, WorkerStartError> {
        if !instance.needs_dedicated_worker() {
            return Ok(Placement::Local(instance));
        }
        if self.has_worker(plugin_path) {
            // One worker per path; the manager never gets here twice.
            return Err(WorkerStartError {
                error: PluginError::WorkerStartFailed {
                    plugin_path: plugin_path.to_path_buf(),
                    cause: "a worker already exists for this plugin".to_string(),
                },
                instance,
            });
        }

        let (command_tx, command_rx) = mpsc::channel();
        let (finished_tx, finished_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let context = WorkerContext {
            plugin_path: plugin_path.to_path_buf(),
            stop: stop.clone(),
        };

        let spawned = std::thread::Builder::new()
            .name(format!("plugin-{}", module_base_name(plugin_path)))
            .spawn(move || run_worker(context, command_rx, finished_tx));
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                return Err(WorkerStartError {
                    error: PluginError::WorkerStartFailed {
                        plugin_path: plugin_path.to_path_buf(),
                        cause: e.to_string(),
                    },
                    instance,
                })
            }
        };

        let mut handle = WorkerHandle {
            plugin_path: plugin_path.to_path_buf(),
            commands: command_tx,
            finished: finished_rx,
            stop,
            thread: Some(thread),
            started: false,
        };

        if let Err(mpsc::SendError(command)) = handle.commands.send(WorkerCommand::Adopt(instance)) {
            let _ = handle.thread.take().map(JoinHandle::join);
            let WorkerCommand::Adopt(instance) = command else {
                unreachable!("only Adopt was sent")
            };
            return Err(WorkerStartError {
                error: PluginError::WorkerStartFailed {
                    plugin_path: plugin_path.to_path_buf(),
                    cause: "worker exited before adopting the instance".to_string(),
                },
                instance,
            });
        }
        handle.started = true;

        log::info!("Started worker thread for {}", plugin_path.display());
        self.workers.push(handle);
        Ok(Placement::OnWorker)
    }

    /// Queue `job` to run on the worker that owns the plugin's instance
    pub fn dispatch(&self, plugin_path: &Path, job: InstanceJob) -> PluginResult<()> {
        let handle = self
            .workers
            .iter()
            .find(|w| w.plugin_path == plugin_path)
            .ok_or_else(|| PluginError::NotLoaded {
                plugin_path: plugin_path.to_path_buf(),
            })?;
        handle
            .commands
            .send(WorkerCommand::Invoke(job))
            .map_err(|_| PluginError::DispatchFailed {
                plugin_path: plugin_path.to_path_buf(),
                cause: "worker is no longer accepting work".to_string(),
            })
    }

    /// Stop every worker, newest first. One worker failing to stop does not
    /// prevent the others from being stopped.
    pub fn stop_all(&mut self) -> Vec<StoppedWorker> {
        let mut stopped = Vec::with_capacity(self.workers.len());
        while let Some(handle) = self.workers.pop() {
            stopped.push(self.stop_worker(handle));
        }
        stopped
    }

    fn stop_worker(&self, mut handle: WorkerHandle) -> StoppedWorker {
        let plugin_path = handle.plugin_path.clone();
        log::debug!(
            "Stopping worker for {} (started: {})",
            plugin_path.display(),
            handle.started
        );

        handle.stop.store(true, Ordering::Release);
        // A closed channel means the thread is already gone; the finished
        // channel below tells us how it ended.
        let _ = handle.commands.send(WorkerCommand::Stop);

        let received = match self.stop_timeout {
            Some(timeout) => handle.finished.recv_timeout(timeout),
            None => handle
                .finished
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(instance) => {
                if let Some(thread) = handle.thread.take() {
                    let _ = thread.join();
                }
                log::info!("Stopped worker thread for {}", plugin_path.display());
                StoppedWorker {
                    plugin_path,
                    outcome: Ok(instance),
                    detached: false,
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // Dropping the JoinHandle detaches the thread.
                handle.thread.take();
                StoppedWorker {
                    outcome: Err(PluginError::WorkerStopFailed {
                        plugin_path: plugin_path.clone(),
                        cause: format!(
                            "did not stop within {:?}; thread detached",
                            self.stop_timeout.unwrap_or_default()
                        ),
                    }),
                    plugin_path,
                    detached: true,
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                let cause = match handle.thread.take().map(JoinHandle::join) {
                    Some(Err(payload)) => panic_message(payload.as_ref()),
                    _ => "worker exited without returning its instance".to_string(),
                };
                StoppedWorker {
                    outcome: Err(PluginError::WorkerStopFailed {
                        plugin_path: plugin_path.clone(),
                        cause,
                    }),
                    plugin_path,
                    detached: false,
                }
            }
        }
    }
}

impl std::fmt::Debug for WorkerSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSupervisor")
            .field(
                "workers",
                &self.workers.iter().map(|w| &w.plugin_path).collect::<Vec<_>>(),
            )
            .field("stop_timeout", &self.stop_timeout)
            .finish()
    }
}

fn run_worker(
    context: WorkerContext,
    commands: Receiver<WorkerCommand>,
    finished: Sender<Box<dyn PluginInstance>>,
) {
    let path = context.plugin_path.display().to_string();
    let mut instance = match commands.recv() {
        Ok(WorkerCommand::Adopt(instance)) => instance,
        _ => return,
    };

    match catch_unwind(AssertUnwindSafe(|| instance.start_thread(&context))) {
        Ok(Ok(())) => log::debug!("start_thread completed for {}", path),
        Ok(Err(e)) => log::error!(
            "{}",
            PluginError::WorkerStartFailed {
                plugin_path: context.plugin_path.clone(),
                cause: e.to_string(),
            }
        ),
        Err(payload) => log::error!(
            "{}",
            PluginError::WorkerStartFailed {
                plugin_path: context.plugin_path.clone(),
                cause: panic_message(payload.as_ref()),
            }
        ),
    }

    while let Ok(command) = commands.recv() {
        match command {
            WorkerCommand::Invoke(job) => {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job(instance.as_mut()))) {
                    log::error!(
                        "Dispatched call on {} {}",
                        path,
                        panic_message(payload.as_ref())
                    );
                }
            }
            WorkerCommand::Stop => break,
            WorkerCommand::Adopt(_) => {
                log::warn!("Worker for {} already owns an instance; ignoring", path)
            }
        }
    }

    let _ = finished.send(instance);
}
