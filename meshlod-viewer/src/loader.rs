//! Background model loading
//!
//! Each request gets a generation number and a cancellation flag. Starting a
//! new load cancels the previous one, and results carrying an older
//! generation are dropped when they arrive.

use crate::{ViewerError, ViewerResult};
use meshlod_io::{NamedGeometry, ObjReader};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};

/// How a loaded model is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Plain,
    Simplify,
}

/// Result of one background parse
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub mode: LoadMode,
    pub result: ViewerResult<Vec<NamedGeometry>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "parser panicked".to_string())
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    cancel: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct ModelLoader {
    sender: flume::Sender<LoadOutcome>,
    receiver: flume::Receiver<LoadOutcome>,
    generation: u64,
    pending: Option<Pending>,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            generation: 0,
            pending: None,
        }
    }

    /// Generation of the most recent request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Parse `bytes` as OBJ on a worker thread. Returns the generation of
    /// the new request.
    pub fn request(&mut self, bytes: Vec<u8>, mode: LoadMode) -> ViewerResult<u64> {
        self.spawn(mode, move || ObjReader::read_bytes(&bytes).map_err(ViewerError::from))
    }

    /// Run `parse` on a worker thread under a fresh generation. A panicking
    /// parse is delivered as a failed load.
    pub(crate) fn spawn<F>(&mut self, mode: LoadMode, parse: F) -> ViewerResult<u64>
    where
        F: FnOnce() -> ViewerResult<Vec<NamedGeometry>> + Send + 'static,
    {
        self.cancel_pending();
        self.generation += 1;
        let generation = self.generation;
        let cancel = Arc::new(AtomicBool::new(false));

        let sender = self.sender.clone();
        let flag = Arc::clone(&cancel);
        thread::Builder::new()
            .name(format!("meshlod-load-{}", generation))
            .spawn(move || {
                if flag.load(Ordering::Acquire) {
                    return;
                }
                let result = panic::catch_unwind(AssertUnwindSafe(parse)).unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!(generation, %message, "model parser panicked");
                    Err(ViewerError::LoadFailed(message))
                });
                if flag.load(Ordering::Acquire) {
                    debug!(generation, "load cancelled before delivery");
                    return;
                }
                // The receiver lives as long as the loader
                let _ = sender.send(LoadOutcome {
                    generation,
                    mode,
                    result,
                });
            })?;

        self.pending = Some(Pending { generation, cancel });
        debug!(generation, ?mode, "load requested");
        Ok(generation)
    }

    /// Deliver a value computed on the caller's thread under a fresh
    /// generation, superseding any pending load
    pub fn resolve_now(&mut self, mode: LoadMode, meshes: Vec<NamedGeometry>) -> LoadOutcome {
        self.cancel_pending();
        self.generation += 1;
        LoadOutcome {
            generation: self.generation,
            mode,
            result: Ok(meshes),
        }
    }

    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.store(true, Ordering::Release);
            debug!(generation = pending.generation, "load cancelled");
        }
    }

    fn accept(&mut self, outcome: LoadOutcome) -> Option<LoadOutcome> {
        if outcome.generation != self.generation {
            warn!(
                generation = outcome.generation,
                current = self.generation,
                "discarding stale load"
            );
            return None;
        }
        self.pending = None;
        Some(outcome)
    }

    /// Newest completed load, if any. Stale outcomes are discarded.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let mut latest = None;
        while let Ok(outcome) = self.receiver.try_recv() {
            if let Some(outcome) = self.accept(outcome) {
                latest = Some(outcome);
            }
        }
        latest
    }

    /// Block until the pending load completes or `timeout` elapses.
    /// Returns `Ok(None)` when nothing is pending or on timeout.
    pub fn wait(&mut self, timeout: Duration) -> ViewerResult<Option<LoadOutcome>> {
        let deadline = std::time::Instant::now() + timeout;
        while self.pending.is_some() {
            match self.receiver.recv_deadline(deadline) {
                Ok(outcome) => {
                    if let Some(outcome) = self.accept(outcome) {
                        return Ok(Some(outcome));
                    }
                }
                Err(flume::RecvTimeoutError::Timeout) => return Ok(None),
                Err(flume::RecvTimeoutError::Disconnected) => return Err(ViewerError::LoaderDisconnected),
            }
        }
        Ok(None)
    }
}

impl Drop for ModelLoader {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &[u8] = b"v 0 0 0\nv 1 0 0\nv 0 1 0\no tri\nf 1 2 3\n";
    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_load_completes() {
        let mut loader = ModelLoader::new();
        let generation = loader.request(TRIANGLE.to_vec(), LoadMode::Plain).unwrap();
        let outcome = loader.wait(TIMEOUT).unwrap().unwrap();
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.mode, LoadMode::Plain);
        let meshes = outcome.result.unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "tri");
        assert!(!loader.is_pending());
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut loader = ModelLoader::new();
        loader.request(TRIANGLE.to_vec(), LoadMode::Plain).unwrap();
        let newest = loader.request(TRIANGLE.to_vec(), LoadMode::Simplify).unwrap();
        let outcome = loader.wait(TIMEOUT).unwrap().unwrap();
        assert_eq!(outcome.generation, newest);
        assert_eq!(outcome.mode, LoadMode::Simplify);
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_parse_failure_is_delivered() {
        let mut loader = ModelLoader::new();
        loader.request(b"v 0 0 0\nf 1 2 9\n".to_vec(), LoadMode::Plain).unwrap();
        let outcome = loader.wait(TIMEOUT).unwrap().unwrap();
        assert!(outcome.result.is_err());
    }

    #[test]
    fn test_panicking_parse_is_delivered_as_failure() {
        let mut loader = ModelLoader::new();
        let generation = loader
            .spawn(LoadMode::Plain, || panic!("unsupported statement"))
            .unwrap();
        let outcome = loader.wait(TIMEOUT).unwrap().unwrap();
        assert_eq!(outcome.generation, generation);
        match outcome.result {
            Err(ViewerError::LoadFailed(message)) => assert!(message.contains("unsupported statement")),
            other => panic!("expected LoadFailed, got {:?}", other.map(|m| m.len())),
        }
        assert!(!loader.is_pending());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_wait_without_pending() {
        let mut loader = ModelLoader::new();
        assert!(loader.wait(Duration::from_millis(1)).unwrap().is_none());
    }

    #[test]
    fn test_resolve_now_cancels_pending() {
        let mut loader = ModelLoader::new();
        loader.request(TRIANGLE.to_vec(), LoadMode::Plain).unwrap();
        let outcome = loader.resolve_now(LoadMode::Simplify, Vec::new());
        assert_eq!(outcome.generation, 2);
        assert!(!loader.is_pending());
    }
}
