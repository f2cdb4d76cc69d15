use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use airlock_transport::UnixDomainSocket;
use tracing::{debug, info};

/// Requests that a running [`RpcServer`](crate::RpcServer) stop.
///
/// Cheap to clone and safe to trigger from a signal handler thread. Triggering
/// it more than once has no further effect.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    inner: Arc<ShutdownState>,
}

#[derive(Debug)]
struct ShutdownState {
    requested: AtomicBool,
    path: PathBuf,
}

impl ShutdownHandle {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            inner: Arc::new(ShutdownState {
                requested: AtomicBool::new(false),
                path: path.to_path_buf(),
            }),
        }
    }

    /// Ask the server to stop.
    ///
    /// The server may be blocked in `accept`, so a throwaway connection is
    /// opened to wake it; the server sees the flag and exits without
    /// processing that connection.
    pub fn shutdown(&self) {
        if self.mark() {
            return;
        }
        info!(path = ?self.inner.path, "shutdown requested");
        match UnixDomainSocket::connect(&self.inner.path) {
            Ok(stream) => drop(stream),
            Err(err) => debug!(error = %err, "wake-up connection failed; server already gone"),
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Set the flag without waking the server. Returns the previous state.
    pub(crate) fn mark(&self) -> bool {
        self.inner.requested.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_idempotent_without_server() {
        let handle = ShutdownHandle::new(Path::new("/tmp/airlock-no-such-server.sock"));
        assert!(!handle.is_shutdown());

        handle.shutdown();
        handle.shutdown();
        assert!(handle.is_shutdown());
    }

    #[test]
    fn clones_share_state() {
        let handle = ShutdownHandle::new(Path::new("/tmp/airlock-no-such-server.sock"));
        let clone = handle.clone();
        clone.shutdown();
        assert!(handle.is_shutdown());
    }
}
