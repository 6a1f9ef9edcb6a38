//! Correlation table for in-flight requests.
//!
//! An entry is settled only by whoever removes it from the table, so a
//! response, a timeout and a teardown racing for the same id settle it once.

use std::collections::HashMap;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::rpc::RpcResult;

/// One request awaiting its response.
#[derive(Debug)]
pub struct PendingRequest {
    settle: oneshot::Sender<RpcResult>,
    timer: AbortHandle,
}

impl PendingRequest {
    /// Create an entry from the caller's channel and its timeout task.
    #[must_use]
    pub fn new(settle: oneshot::Sender<RpcResult>, timer: AbortHandle) -> Self {
        Self { settle, timer }
    }

    /// Cancel the timer and deliver the result.
    pub fn settle(self, result: RpcResult) {
        self.timer.abort();
        // The caller may have stopped waiting.
        let _ = self.settle.send(result);
    }
}

/// Requests keyed by correlation id.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<String, PendingRequest>,
}

impl PendingTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request.
    pub fn insert(&mut self, id: String, request: PendingRequest) {
        self.entries.insert(id, request);
    }

    /// Remove a request, handing its settlement to the caller.
    pub fn take(&mut self, id: &str) -> Option<PendingRequest> {
        self.entries.remove(id)
    }

    /// Remove every request.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.entries.drain().map(|(_, request)| request).collect()
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn idle_timer() -> AbortHandle {
        tokio::spawn(tokio::time::sleep(Duration::from_secs(3600))).abort_handle()
    }

    #[tokio::test]
    async fn test_take_settles_once() {
        let mut table = PendingTable::new();
        let (tx, rx) = oneshot::channel();
        table.insert("a".into(), PendingRequest::new(tx, idle_timer()));
        assert_eq!(table.len(), 1);

        let entry = table.take("a").expect("entry");
        assert!(table.take("a").is_none());
        entry.settle(RpcResult::success(None));

        let result = rx.await.expect("settled");
        assert!(result.ok);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_settle_aborts_timer() {
        let timer = tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)));
        let (tx, _rx) = oneshot::channel();
        PendingRequest::new(tx, timer.abort_handle()).settle(RpcResult::success(None));

        let joined = timer.await;
        assert!(joined.expect_err("timer aborted").is_cancelled());
    }

    #[tokio::test]
    async fn test_drain_empties_table() {
        let mut table = PendingTable::new();
        let mut receivers = Vec::new();
        for id in ["a", "b", "c"] {
            let (tx, rx) = oneshot::channel();
            table.insert(id.into(), PendingRequest::new(tx, idle_timer()));
            receivers.push(rx);
        }

        for entry in table.drain() {
            entry.settle(RpcResult::failure("CONNECTION_CLOSED", "connection closed"));
        }
        assert!(table.is_empty());
        for rx in receivers {
            assert_eq!(rx.await.expect("settled").error_code(), Some("CONNECTION_CLOSED"));
        }
    }
}
