//! Owned timer handles
//!
//! Every timer the controller arms is a Tokio task. The session owns it
//! through a [`TimerHandle`], so replacing or clearing the slot aborts the
//! task and no timer can outlive its slot.

use tokio::task::JoinHandle;

/// Handle to a spawned timer task, aborted on drop
#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
    handle: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Wrap a spawned task under a session-unique id
    pub fn new(id: u64, handle: JoinHandle<()>) -> Self {
        Self {
            id,
            handle: Some(handle),
        }
    }

    /// Session-unique timer id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Release the slot without aborting the task.
    ///
    /// Used by a timer task that is clearing its own slot: aborting itself
    /// would cancel the work it is about to do.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn spawn_flag_timer(flag: Arc<AtomicBool>, delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_timer() {
        let fired = Arc::new(AtomicBool::new(false));
        let timer = TimerHandle::new(1, spawn_flag_timer(fired.clone(), Duration::from_secs(1)));

        drop(timer);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_lets_timer_run() {
        let fired = Arc::new(AtomicBool::new(false));
        let timer = TimerHandle::new(2, spawn_flag_timer(fired.clone(), Duration::from_secs(1)));

        assert_eq!(timer.id(), 2);
        timer.detach();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(fired.load(Ordering::SeqCst));
    }
}
