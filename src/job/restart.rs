// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/job/restart.rs
//
// C8: Restart Bus. A cancellation signal broadcast to every worker thread
// when a clean job arrives, a reconnect happens, or a duplicate/stale share
// forces in-flight work to be abandoned. Built on tokio::sync::watch: workers
// only ever care about the latest restart generation, not a queue of past
// restarts, and a late-subscribing worker must immediately see "already
// restarted" rather than miss the signal — exactly the latest-value-plus-
// wake-all semantics watch provides, the same primitive bosminer's work
// module uses to distribute its current work engine to every job solver.

use tokio::sync::watch;

/// Each bump of the restart bus carries a new, strictly increasing token.
/// Workers compare their last-seen token against the current one to decide
/// whether their in-flight scan has been superseded.
pub struct RestartBus {
    tx: watch::Sender<u64>,
}

/// A worker-side handle for observing restart signals.
#[derive(Clone)]
pub struct RestartWatcher {
    rx: watch::Receiver<u64>,
}

impl RestartBus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0u64);
        Self { tx }
    }

    /// Signal every worker to abandon in-flight work. Cheap: this only
    /// updates the watched value, it does not block on readers.
    pub fn restart(&self) {
        self.tx.send_modify(|token| *token = token.wrapping_add(1));
    }

    pub fn current_token(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn watcher(&self) -> RestartWatcher {
        RestartWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for RestartBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartWatcher {
    /// Token observed on the watcher's last check or wait.
    pub fn last_seen(&self) -> u64 {
        *self.rx.borrow()
    }

    /// True if the bus has moved on since `since`.
    pub fn has_restarted_since(&self, since: u64) -> bool {
        self.last_seen() != since
    }

    /// Async wait for the next restart, for use inside a worker's
    /// `tokio::select!` against its job/upstream channels. Not used by the
    /// CPU-bound scan loop itself, which polls `has_restarted_since`
    /// between batches instead of blocking.
    pub async fn wait_for_restart(&mut self) -> u64 {
        let _ = self.rx.changed().await;
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_watcher_sees_initial_token() {
        let bus = RestartBus::new();
        let watcher = bus.watcher();
        assert_eq!(watcher.last_seen(), 0);
        assert!(!watcher.has_restarted_since(0));
    }

    #[test]
    fn restart_bumps_token_and_is_observed() {
        let bus = RestartBus::new();
        let watcher = bus.watcher();
        bus.restart();
        assert!(watcher.has_restarted_since(0));
        assert_eq!(watcher.last_seen(), bus.current_token());
    }

    #[test]
    fn late_subscriber_sees_current_token_immediately() {
        let bus = RestartBus::new();
        bus.restart();
        bus.restart();
        let watcher = bus.watcher();
        assert_eq!(watcher.last_seen(), 2);
    }

    #[tokio::test]
    async fn wait_for_restart_unblocks_on_signal() {
        let bus = RestartBus::new();
        let mut watcher = bus.watcher();
        let handle = tokio::spawn(async move { watcher.wait_for_restart().await });
        tokio::task::yield_now().await;
        bus.restart();
        let token = handle.await.unwrap();
        assert_eq!(token, 1);
    }
}
