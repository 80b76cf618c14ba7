//! Cooperative cancellation and pause tokens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// A cloneable cancellation flag checked by long running work at well
/// defined points.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A cloneable pause flag. Workers call `wait_while_paused()` which blocks on
/// a condition variable until resumed.
#[derive(Clone, Default)]
pub struct PauseToken {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl PauseToken {
    /// Create a new token in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause workers at their next suspension point.
    pub fn pause(&self) {
        let (lock, _) = &*self.state;
        let mut paused = lock.lock().unwrap_or_else(|e| e.into_inner());
        *paused = true;
    }

    /// Resume paused workers.
    pub fn resume(&self) {
        let (lock, cvar) = &*self.state;
        let mut paused = lock.lock().unwrap_or_else(|e| e.into_inner());
        *paused = false;
        cvar.notify_all();
    }

    /// Returns true if paused.
    pub fn is_paused(&self) -> bool {
        let (lock, _) = &*self.state;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks the calling thread while the token is paused. Returns
    /// immediately if cancellation was requested so a paused job can still
    /// be stopped.
    ///
    /// * `cancel` - Cancellation token to observe while waiting.
    pub fn wait_while_paused(&self, cancel: &CancelToken) {
        let (lock, cvar) = &*self.state;
        let mut paused = lock.lock().unwrap_or_else(|e| e.into_inner());
        while *paused && !cancel.is_cancelled() {
            paused = match cvar.wait_timeout(paused, std::time::Duration::from_millis(50)) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn cancel_is_shared_between_clones() {
        let t = CancelToken::new();
        let c = t.clone();
        assert!(!c.is_cancelled());
        t.cancel();
        assert!(c.is_cancelled());
    }

    #[test]
    fn paused_worker_waits_until_resumed() {
        let pause = PauseToken::new();
        let cancel = CancelToken::new();
        let progress = AtomicUsize::new(0);
        pause.pause();

        thread::scope(|s| {
            s.spawn(|| {
                pause.wait_while_paused(&cancel);
                progress.store(1, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(100));
            assert_eq!(progress.load(Ordering::SeqCst), 0);
            pause.resume();
        });

        assert_eq!(progress.load(Ordering::SeqCst), 1);
        assert!(!pause.is_paused());
    }

    #[test]
    fn cancel_releases_paused_worker() {
        let pause = PauseToken::new();
        let cancel = CancelToken::new();
        pause.pause();
        thread::scope(|s| {
            s.spawn(|| pause.wait_while_paused(&cancel));
            thread::sleep(Duration::from_millis(20));
            cancel.cancel();
        });
        assert!(pause.is_paused());
    }
}
