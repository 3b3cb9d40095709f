//! One-shot readiness signal resolved by the host once its collaborators are up

use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::error;

use crate::error::ViewerError;

/// Waiting side, consumed by [`crate::viewer::Viewer::open`]
#[derive(Debug)]
pub struct ReadySignal {
    rx: Receiver<()>,
}

/// Resolving side, kept by the host
#[derive(Debug, Clone)]
pub struct ReadyHandle {
    tx: Sender<()>,
}

impl ReadySignal {
    #[must_use]
    pub fn channel() -> (Self, ReadyHandle) {
        let (tx, rx) = flume::bounded(1);
        (Self { rx }, ReadyHandle { tx })
    }

    /// A signal that is already resolved
    #[must_use]
    pub fn ready() -> Self {
        let (signal, handle) = Self::channel();
        handle.resolve();
        signal
    }

    /// Block until resolved or `timeout` passes. A handle dropped without
    /// resolving fails immediately.
    pub fn wait(self, timeout: Duration) -> Result<(), ViewerError> {
        let started = Instant::now();
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                error!("Viewer dependencies unavailable after {waited_ms} ms");
                Err(ViewerError::DependencyUnavailable { waited_ms })
            }
        }
    }
}

impl ReadyHandle {
    pub fn resolve(&self) {
        let _ = self.tx.try_send(());
    }
}
