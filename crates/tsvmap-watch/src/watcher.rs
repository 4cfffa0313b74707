//! The rule file watcher and its reconciler task.

use crate::{
    backends::NotifyBackend,
    config::WatcherConfig,
    error::{Error, Result},
    events::{FileEvent, FileEventKind},
    traits::RuleFileHandler,
    utils::{DueDelete, PathDebouncer, PendingDeletes},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tsvmap_config::{has_extension, rule_set_name};

/// Lifecycle state of a [`RuleFileWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherState {
    /// Not watching
    Stopped,
    /// Watching and reconciling events
    Running,
}

/// Snapshot of the watcher for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatcherStatus {
    /// Lifecycle state
    pub state: WatcherState,
    /// Watched directory
    pub directory: PathBuf,
    /// Deletes waiting out their grace delay
    pub pending_deletes: usize,
    /// Callbacks invoked since start
    pub callbacks_run: u64,
}

/// Watches one directory and forwards rule file changes to a handler.
///
/// `stopped -> running -> stopped`; a running watcher must be stopped before
/// it can be started again.
pub struct RuleFileWatcher {
    config: WatcherConfig,
    handler: Arc<dyn RuleFileHandler>,
    backend: Option<NotifyBackend>,
    processor_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    pending_count: Arc<AtomicUsize>,
    callbacks_run: Arc<AtomicU64>,
}

impl RuleFileWatcher {
    /// Create a stopped watcher.
    pub fn new(config: WatcherConfig, handler: Arc<dyn RuleFileHandler>) -> Self {
        Self {
            config,
            handler,
            backend: None,
            processor_task: None,
            shutdown_tx: None,
            pending_count: Arc::new(AtomicUsize::new(0)),
            callbacks_run: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Watcher configuration.
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Whether the watcher is running.
    pub fn is_running(&self) -> bool {
        self.processor_task.is_some()
    }

    /// Current status.
    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            state: if self.is_running() {
                WatcherState::Running
            } else {
                WatcherState::Stopped
            },
            directory: self.config.watch_dir.clone(),
            pending_deletes: self.pending_count.load(Ordering::Relaxed),
            callbacks_run: self.callbacks_run.load(Ordering::Relaxed),
        }
    }

    /// Validate the directory, register for notifications and start the
    /// reconciler.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }

        let dir = &self.config.watch_dir;
        if !dir.is_dir() {
            return Err(Error::InvalidPath(format!(
                "{} does not exist or is not a directory",
                dir.display()
            )));
        }

        info!("Starting rule file watcher on {}", dir.display());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let processor = EventProcessor::new(
            self.config.clone(),
            Arc::clone(&self.handler),
            Arc::clone(&self.callbacks_run),
        );
        self.pending_count = processor.pending_counter();

        let backend = NotifyBackend::start(dir, self.config.backend_debounce(), event_tx)?;
        let task = tokio::spawn(processor.run(event_rx, shutdown_rx));

        self.backend = Some(backend);
        self.processor_task = Some(task);
        self.shutdown_tx = Some(shutdown_tx);

        info!("Rule file watcher started");
        Ok(())
    }

    /// Unregister notifications and wait (bounded) for the reconciler.
    ///
    /// A reconciler that does not exit within the stop timeout is aborted;
    /// the watcher still ends up stopped.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut task) = self.processor_task.take() else {
            return Ok(());
        };

        info!("Stopping rule file watcher");
        let timeout = self.config.stop_timeout();
        let deadline = tokio::time::Instant::now() + timeout;

        if let Some(backend) = self.backend.take() {
            let joined = tokio::task::spawn_blocking(move || backend.stop());
            match tokio::time::timeout_at(deadline, joined).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Notification thread shutdown failed: {}", e),
                Err(_) => warn!(
                    "Notification thread did not exit within {:?}",
                    timeout
                ),
            }
        }

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }

        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Reconciler task failed: {}", e),
            Err(_) => {
                warn!(
                    "Reconciler did not exit within {:?}, aborting it",
                    timeout
                );
                task.abort();
            }
        }

        self.pending_count.store(0, Ordering::Relaxed);
        info!("Rule file watcher stopped");
        Ok(())
    }
}

impl std::fmt::Debug for RuleFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleFileWatcher")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for RuleFileWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.processor_task.take() {
            task.abort();
        }
    }
}

/// Single consumer of file events; owns all debounce and delete state.
pub(crate) struct EventProcessor {
    config: WatcherConfig,
    handler: Arc<dyn RuleFileHandler>,
    debouncer: PathDebouncer,
    pending: PendingDeletes,
    due_rx: mpsc::UnboundedReceiver<DueDelete>,
    callbacks_run: Arc<AtomicU64>,
}

impl EventProcessor {
    pub(crate) fn new(
        config: WatcherConfig,
        handler: Arc<dyn RuleFileHandler>,
        callbacks_run: Arc<AtomicU64>,
    ) -> Self {
        let (due_tx, due_rx) = mpsc::unbounded_channel();
        Self {
            debouncer: PathDebouncer::new(config.debounce()),
            pending: PendingDeletes::new(config.delete_grace(), due_tx),
            config,
            handler,
            due_rx,
            callbacks_run,
        }
    }

    pub(crate) fn pending_counter(&self) -> Arc<AtomicUsize> {
        self.pending.counter()
    }

    pub(crate) async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<FileEvent>,
        mut shutdown: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_event(event).await,
                Some(due) = self.due_rx.recv() => self.handle_due(due).await,
                _ = shutdown.recv() => {
                    info!("Reconciler shutting down");
                    break;
                }
            }
        }

        if !self.pending.is_empty() {
            debug!("Discarding {} pending deletes", self.pending.len());
        }
        self.pending.clear();
    }

    pub(crate) async fn handle_event(&mut self, event: FileEvent) {
        if event.is_dir || !has_extension(&event.path, &self.config.extension) {
            return;
        }
        let Some(name) = rule_set_name(&event.path) else {
            return;
        };

        match event.kind {
            FileEventKind::Created | FileEventKind::Modified => {
                if self.pending.cancel(&name) {
                    info!(rule_set = %name, "Rule file reappeared, delete cancelled");
                }
                let now = Instant::now();
                if !self.debouncer.should_process(&event.path, now) {
                    return;
                }
                self.debouncer.prune(now);
                self.run_changed(event.path).await;
            }
            FileEventKind::Deleted => {
                self.debouncer.forget(&event.path);
                self.pending.schedule(&name, &event.path);
            }
        }
    }

    pub(crate) async fn handle_due(&mut self, due: DueDelete) {
        if !self.pending.take_due(&due) {
            return;
        }
        let handler = Arc::clone(&self.handler);
        let path = due.path;
        debug!(rule_set = %due.name, "Grace delay elapsed, removing rule set");

        let result = tokio::task::spawn_blocking(move || handler.on_deleted(&path)).await;
        self.record(result, &due.name, "delete");
    }

    async fn run_changed(&mut self, path: PathBuf) {
        let handler = Arc::clone(&self.handler);
        let label = path.display().to_string();
        debug!("Rule file changed: {}", label);

        let result = tokio::task::spawn_blocking(move || handler.on_changed(&path)).await;
        self.record(result, &label, "change");
    }

    fn record(
        &self,
        result: std::result::Result<Result<()>, tokio::task::JoinError>,
        subject: &str,
        callback: &str,
    ) {
        self.callbacks_run.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} callback failed for {}: {}", callback, subject, e),
            Err(e) => error!("{} callback panicked for {}: {}", callback, subject, e),
        }
    }
}
