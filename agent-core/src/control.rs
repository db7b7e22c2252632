//! The handle a caller keeps alongside an in-flight `prompt()` future to
//! steer or abort it. Cheaply `Clone`-able: every clone shares the same underlying run state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AgentControl {
    run_cancel: Arc<Mutex<CancellationToken>>,
    pending_steer: Arc<Mutex<Option<String>>>,
    running: Arc<AtomicBool>,
    idle: Arc<Notify>,
}

impl Default for AgentControl {
    fn default() -> Self {
        AgentControl {
            run_cancel: Arc::new(Mutex::new(CancellationToken::new())),
            pending_steer: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            idle: Arc::new(Notify::new()),
        }
    }
}

impl AgentControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `text` to interrupt the in-flight run at the next tool-call
    /// boundary. A no-op if nothing is running; the marker is simply consumed at the next boundary a
    /// later run reaches.
    #[allow(clippy::expect_used)]
    pub fn steer(&self, text: impl Into<String>) {
        *self.pending_steer.lock().expect("control mutex poisoned") = Some(text.into());
    }

    /// Cancels whatever provider request or tool execution is currently in
    /// flight. The run loop observes this via the per-run cancellation
    /// token and winds down with `stopReason: aborted`.
    #[allow(clippy::expect_used)]
    pub fn abort(&self) {
        self.run_cancel.lock().expect("control mutex poisoned").cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolves once the current run (if any) has finished.
    pub async fn wait_for_idle(&self) {
        loop {
            if !self.is_running() {
                return;
            }
            self.idle.notified().await;
        }
    }

    #[allow(clippy::expect_used)]
    pub(crate) fn begin_run(&self) -> Result<CancellationToken, ()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(());
        }
        let fresh = CancellationToken::new();
        *self.run_cancel.lock().expect("control mutex poisoned") = fresh.clone();
        Ok(fresh)
    }

    pub(crate) fn end_run(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.idle.notify_waiters();
    }

    #[allow(clippy::expect_used)]
    pub(crate) fn take_pending_steer(&self) -> Option<String> {
        self.pending_steer.lock().expect("control mutex poisoned").take()
    }

    #[allow(clippy::expect_used)]
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.run_cancel.lock().expect("control mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn steer_then_take_round_trips_once() {
        let control = AgentControl::new();
        control.steer("hold on");
        assert_eq!(control.take_pending_steer().as_deref(), Some("hold on"));
        assert_eq!(control.take_pending_steer(), None);
    }

    #[test]
    fn begin_run_rejects_reentry_until_end_run() {
        let control = AgentControl::new();
        assert!(control.begin_run().is_ok());
        assert!(control.begin_run().is_err());
        control.end_run();
        assert!(control.begin_run().is_ok());
    }

    #[tokio::test]
    async fn wait_for_idle_returns_immediately_when_not_running() {
        let control = AgentControl::new();
        control.wait_for_idle().await;
    }
}
