use super::scanner::scan_tree;
use crate::kernel::services::ports::{DirScanner, ScanId};
use crate::kernel::services::KernelBusSender;
use crate::kernel::Action;
use crate::models::{NodeId, PathFilter};
use rustc_hash::FxHashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes the kernel's IO effects on tokio and reports back over the bus.
pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
    tx: KernelBusSender,
    scanner: Arc<dyn DirScanner>,
    filter: PathFilter,
    chunk_size: usize,
    scans: FxHashMap<ScanId, Arc<AtomicBool>>,
}

impl AsyncRuntime {
    pub fn new(
        tx: KernelBusSender,
        scanner: Arc<dyn DirScanner>,
        filter: PathFilter,
        chunk_size: usize,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "Failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            })?;
        Ok(Self {
            runtime,
            tx,
            scanner,
            filter,
            chunk_size,
            scans: FxHashMap::default(),
        })
    }

    pub fn tokio_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    pub fn active_scans(&self) -> usize {
        self.scans.len()
    }

    pub fn start_scan(&mut self, root: NodeId, scan: ScanId, root_path: PathBuf, dir: PathBuf) {
        let cancel = Arc::new(AtomicBool::new(false));
        self.scans.insert(scan, Arc::clone(&cancel));

        let tx = self.tx.clone();
        let scanner = Arc::clone(&self.scanner);
        let filter = self.filter.clone();
        let chunk_size = self.chunk_size;
        self.runtime.spawn(async move {
            let chunk_tx = tx.clone();
            let result = tokio::task::spawn_blocking(move || {
                scan_tree(
                    scanner.as_ref(),
                    &filter,
                    &root_path,
                    &dir,
                    chunk_size,
                    &cancel,
                    |entries| {
                        let sent = chunk_tx.send_action(Action::ScanChunk {
                            root,
                            scan,
                            entries,
                        });
                        if !sent {
                            cancel.store(true, Ordering::Relaxed);
                        }
                    },
                )
            })
            .await;

            let error = match result {
                Ok(summary) if summary.cancelled => {
                    tracing::debug!(scan = scan.0, "scan cancelled");
                    return;
                }
                Ok(summary) => (!summary.errors.is_empty()).then(|| summary.errors.join("; ")),
                Err(e) => Some(e.to_string()),
            };
            tx.send_action(Action::ScanFinished { root, scan, error });
        });
    }

    pub fn cancel_scan(&mut self, scan: ScanId) {
        if let Some(cancel) = self.scans.remove(&scan) {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    pub fn forget_scan(&mut self, scan: ScanId) {
        self.scans.remove(&scan);
    }

    pub fn schedule_tick(&self, after: Duration) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            tx.send_action(Action::Tick {
                now: Instant::now(),
            });
        });
    }

    pub fn rename_path(&self, from: PathBuf, to: PathBuf) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            if let Err(e) = tokio::fs::rename(&from, &to).await {
                tx.send_action(Action::RenameFailed {
                    from,
                    to,
                    error: e.to_string(),
                });
            }
        });
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/runtime.rs"]
mod tests;
