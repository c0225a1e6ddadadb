use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Weak;
use std::thread::JoinHandle;

use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use notify::Event;
use notify::EventKind;
use notify::PollWatcher;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Invalidate;
use crate::PoolError;
use crate::Result;
use crate::WatchBackend;
use crate::WatcherConfig;

/// Message from the notify callback to the dispatcher thread
#[derive(Debug)]
enum WatchSignal {
    Flush { paths: Vec<PathBuf> },
}

/// Recursive watch over mapfile directories
///
/// Change events are forwarded to a dedicated dispatcher thread which calls
/// [`Invalidate::invalidate`] on the target. The dispatcher only holds a weak
/// reference and exits once the target is gone or the watcher is dropped.
pub struct InvalidationWatcher {
    /// Dropped first on shutdown so no callback races the dispatcher exit
    backend: Option<Box<dyn Watcher + Send>>,
    roots: HashSet<PathBuf>,
    shutdown_tx: Option<Sender<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl InvalidationWatcher {
    /// Starts watching `root` recursively.
    pub fn start(
        root: &Path,
        config: &WatcherConfig,
        target: Weak<dyn Invalidate>,
    ) -> Result<Self> {
        let (signal_tx, signal_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let dispatcher = std::thread::Builder::new()
            .name("renderpool-watch".to_string())
            .spawn(move || dispatch(signal_rx, shutdown_rx, target))
            .map_err(|e| crate::Error::Fatal(format!("failed to spawn watch dispatcher: {e}")))?;

        let mut watcher = Self {
            backend: None,
            roots: HashSet::new(),
            shutdown_tx: Some(shutdown_tx),
            dispatcher: Some(dispatcher),
        };

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                // Dispatcher gone means we are shutting down
                let _ = signal_tx.send(WatchSignal::Flush { paths: event.paths });
            }
            Err(e) => warn!("Watch backend error: {}", e),
        };

        let backend: Box<dyn Watcher + Send> = match config.backend {
            WatchBackend::Poll => Box::new(
                PollWatcher::new(
                    handler,
                    notify::Config::default().with_poll_interval(config.poll_interval()),
                )
                .map_err(|source| PoolError::Watch {
                    path: root.to_path_buf(),
                    source,
                })?,
            ),
            WatchBackend::Native => Box::new(
                RecommendedWatcher::new(handler, notify::Config::default()).map_err(|source| {
                    PoolError::Watch {
                        path: root.to_path_buf(),
                        source,
                    }
                })?,
            ),
        };
        watcher.backend = Some(backend);
        watcher.watch(root)?;

        info!(root = %root.display(), backend = ?config.backend, "Start invalidation watcher");
        Ok(watcher)
    }

    /// Adds `root` to the watched directories. Already watched roots are skipped.
    pub fn watch(
        &mut self,
        root: &Path,
    ) -> Result<()> {
        if self.roots.contains(root) {
            return Ok(());
        }
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        backend
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| PoolError::Watch {
                path: root.to_path_buf(),
                source,
            })?;

        debug!(root = %root.display(), "Watching mapfile directory");
        self.roots.insert(root.to_path_buf());
        Ok(())
    }

    pub fn is_watching(
        &self,
        root: &Path,
    ) -> bool {
        self.roots.contains(root)
    }

    /// `true` while the dispatcher thread runs. It exits on `stop()` or once
    /// the invalidation target is gone.
    pub fn is_dispatching(&self) -> bool {
        self.dispatcher
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    /// Stops the backend and waits for the dispatcher thread to exit.
    ///
    /// Calling `stop()` twice is a no-op.
    pub fn stop(&mut self) {
        self.backend.take();

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.dispatcher.take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for InvalidationWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch(
    signal_rx: Receiver<WatchSignal>,
    shutdown_rx: Receiver<()>,
    target: Weak<dyn Invalidate>,
) {
    debug!("Watch dispatcher thread started");

    loop {
        crossbeam_channel::select! {
            recv(signal_rx) -> result => {
                match result {
                    Ok(WatchSignal::Flush { paths }) => {
                        let Some(target) = target.upgrade() else {
                            debug!("Invalidation target dropped");
                            break;
                        };
                        target.invalidate(&paths);
                    }
                    Err(_) => {
                        debug!("Watch backend closed");
                        break;
                    }
                }
            }
            recv(shutdown_rx) -> _ => {
                debug!("Watch dispatcher received shutdown signal");
                break;
            }
        }
    }

    debug!("Watch dispatcher thread stopped");
}
