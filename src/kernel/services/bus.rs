//! Channel from the scan/tick/rename workers back to the store.
//!
//! Workers only ever produce actions, so the bus carries them as-is. A send
//! failing means the session is gone and the worker should stop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::kernel::Action;

#[derive(Clone)]
pub struct KernelBusSender {
    tx: Sender<Action>,
}

pub struct KernelBusReceiver {
    rx: Receiver<Action>,
}

pub fn kernel_bus() -> (KernelBusSender, KernelBusReceiver) {
    let (tx, rx) = mpsc::channel();
    (KernelBusSender { tx }, KernelBusReceiver { rx })
}

impl KernelBusSender {
    /// False once the receiving session has been dropped.
    pub fn send_action(&self, action: Action) -> bool {
        self.tx.send(action).is_ok()
    }
}

impl KernelBusReceiver {
    /// Everything queued right now, in send order.
    pub fn drain(&mut self) -> Vec<Action> {
        self.rx.try_iter().collect()
    }

    /// Waits up to `timeout` for the next action.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Action> {
        self.rx.recv_timeout(timeout).ok()
    }
}
