//! Headless wiring: store, watcher and async runtime behind one handle.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::kernel::services::adapters::{AsyncRuntime, LocalDirScanner, WatchService};
use crate::kernel::services::ports::{DirScanner, TreeConfig};
use crate::kernel::services::{kernel_bus, KernelBusReceiver, KernelBusSender};
use crate::kernel::{Action, DispatchResult, Effect, Notice, Store};

const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error("failed to create filesystem watcher: {0}")]
    Watcher(#[from] notify::Error),
}

pub struct Session {
    store: Store,
    runtime: AsyncRuntime,
    watcher: WatchService,
    bus_tx: KernelBusSender,
    bus_rx: KernelBusReceiver,
    subscribers: Vec<Sender<Notice>>,
}

impl Session {
    pub fn new(config: TreeConfig) -> Result<Self, SessionError> {
        Self::with_scanner(config, Arc::new(LocalDirScanner))
    }

    pub fn with_scanner(
        config: TreeConfig,
        scanner: Arc<dyn DirScanner>,
    ) -> Result<Self, SessionError> {
        let store = Store::new(config);
        let (bus_tx, bus_rx) = kernel_bus();
        let runtime = AsyncRuntime::new(
            bus_tx.clone(),
            scanner,
            store.filter().clone(),
            store.config().chunk_size(),
        )?;
        let watcher = WatchService::new(store.config().watch_poll_interval(), store.filter().clone())?;
        Ok(Self {
            store,
            runtime,
            watcher,
            bus_tx,
            bus_rx,
            subscribers: Vec::new(),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn watcher(&self) -> &WatchService {
        &self.watcher
    }

    /// Every notice produced from now on is also sent to the returned
    /// receiver. Dropped receivers are pruned.
    pub fn subscribe(&mut self) -> Receiver<Notice> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Applies one action, executes its effects and fans out its notices.
    pub fn dispatch(&mut self, action: Action) -> DispatchResult {
        if let Action::ScanFinished { scan, .. } = &action {
            self.runtime.forget_scan(*scan);
        }
        let result = self.store.dispatch(action);
        for effect in &result.effects {
            self.execute(effect);
        }
        self.publish(&result.notices);
        result
    }

    fn execute(&mut self, effect: &Effect) {
        match effect {
            Effect::StartScan {
                root,
                scan,
                root_path,
                dir,
            } => self
                .runtime
                .start_scan(*root, *scan, root_path.clone(), dir.clone()),
            Effect::CancelScan(scan) => self.runtime.cancel_scan(*scan),
            Effect::Watch(root) => match self.watcher.watch(root) {
                Ok(true) => {}
                Ok(false) => tracing::debug!(root = %root.display(), "watch not installed"),
                Err(e) => {
                    self.bus_tx.send_action(Action::WatchFailed {
                        root: root.clone(),
                        error: e.to_string(),
                    });
                }
            },
            Effect::Unwatch(root) => self.watcher.unwatch(root),
            Effect::ScheduleTick { after } => self.runtime.schedule_tick(*after),
            Effect::RenamePath { from, to } => self.runtime.rename_path(from.clone(), to.clone()),
        }
    }

    fn publish(&mut self, notices: &[Notice]) {
        if notices.is_empty() || self.subscribers.is_empty() {
            return;
        }
        self.subscribers
            .retain(|tx| notices.iter().all(|notice| tx.send(notice.clone()).is_ok()));
    }

    /// Dispatches everything that arrived from the watcher and the runtime
    /// without blocking. Returns the number of actions applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        let now = Instant::now();
        for event in self.watcher.drain_events() {
            self.dispatch(Action::Fs { event, at: now });
            applied += 1;
        }
        for action in self.bus_rx.drain() {
            self.dispatch(action);
            applied += 1;
        }
        applied
    }

    /// Pumps until `done` holds for the store or `timeout` passes.
    pub fn pump_until<F>(&mut self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut(&Store) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(&self.store) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if let Some(action) = self.bus_rx.recv_timeout(IDLE_POLL.min(deadline - now)) {
                self.dispatch(action);
            }
        }
    }
}
