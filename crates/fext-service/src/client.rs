//! Host-side client speaking the line protocol
//!
//! This module provides:
//! - Request ID tracking for matching responses
//! - [`ServiceClient`], a typed [`ServiceControl`] over an outgoing line
//!   channel
//! - Timeout and cancellation handling for stalled requests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::Instant;

use crate::command::ServiceCommand;
use crate::config::ConfigurationUpdate;
use crate::control::ServiceControl;
use crate::state::StatusSnapshot;
use fext_core::prelude::*;
use fext_core::{Control, EventMessage, Message, Request, Response};

/// Default time to wait for a response
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Age after which a still-pending request is failed by the sweep
pub const STALE_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the client sweeps for stale requests
pub const STALE_REQUEST_CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A pending request awaiting response
struct PendingRequest {
    response_tx: oneshot::Sender<Result<Value>>,
    created_at: Instant,
    method: &'static str,
}

/// Tracks pending requests and matches responses
#[derive(Default)]
pub struct RequestTracker {
    pending: RwLock<HashMap<u64, PendingRequest>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending request
    /// Returns (request_id, receiver for the outcome)
    pub async fn register(&self, method: &'static str) -> (u64, oneshot::Receiver<Result<Value>>) {
        let id = next_request_id();
        let (tx, rx) = oneshot::channel();

        self.pending.write().await.insert(
            id,
            PendingRequest {
                response_tx: tx,
                created_at: Instant::now(),
                method,
            },
        );

        (id, rx)
    }

    /// Deliver a response to its waiter.
    /// Returns true if the response was matched to a pending request
    pub async fn handle_response(&self, response: Response) -> bool {
        let id = response.id;
        match self.pending.write().await.remove(&id) {
            Some(pending) => {
                trace!("Response #{} for {}", id, pending.method);
                let _ = pending.response_tx.send(response.into_result());
                true
            }
            None => false,
        }
    }

    /// Drop a pending request without answering it
    pub async fn forget(&self, id: u64) -> bool {
        self.pending.write().await.remove(&id).is_some()
    }

    /// Cancel all pending requests (e.g., on shutdown)
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.write().await;
        for (_, req) in pending.drain() {
            let _ = req.response_tx.send(Err(Error::Cancelled));
        }
    }

    /// Fail requests older than `timeout` and return their ids
    pub async fn cleanup_stale(&self, timeout: Duration) -> Vec<u64> {
        let mut pending = self.pending.write().await;
        let now = Instant::now();

        let stale: Vec<u64> = pending
            .iter()
            .filter(|(_, req)| now.duration_since(req.created_at) > timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some(req) = pending.remove(id) {
                let _ = req.response_tx.send(Err(Error::timeout(req.method)));
            }
        }

        stale
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

/// Sends service commands over the line protocol with request tracking.
///
/// Outgoing lines go to `outgoing`; whoever reads the extension's output
/// feeds each line back through [`handle_line`](Self::handle_line).
#[derive(Clone)]
pub struct ServiceClient {
    outgoing: mpsc::Sender<String>,
    tracker: Arc<RequestTracker>,
    timeout: Duration,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("outgoing", &"<channel>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ServiceClient {
    /// Create a client writing requests to `outgoing`.
    ///
    /// Spawns the stale-request sweep, so this must run inside a Tokio
    /// runtime. Any request still pending after [`STALE_REQUEST_TIMEOUT`] is
    /// failed, including ones whose caller stopped waiting. The sweep ends
    /// once the tracker is dropped.
    pub fn new(outgoing: mpsc::Sender<String>) -> Self {
        let tracker = Arc::new(RequestTracker::new());
        tokio::spawn(sweep_stale_requests(Arc::downgrade(&tracker)));
        Self {
            outgoing,
            tracker,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Per-request timeout. Values above [`STALE_REQUEST_TIMEOUT`] are
    /// effectively capped by the sweep.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn encode(id: u64, command: &ServiceCommand) -> Result<String> {
        Message::from(
            Request::new(id, command.method(), command.params()).with_control(Control::Service),
        )
        .encode()
    }

    /// Send a command and wait for its result
    pub async fn send(&self, command: ServiceCommand) -> Result<Value> {
        self.send_with_timeout(command, self.timeout).await
    }

    /// Send a command with custom timeout
    pub async fn send_with_timeout(
        &self,
        command: ServiceCommand,
        timeout: Duration,
    ) -> Result<Value> {
        let (id, response_rx) = self.tracker.register(command.method()).await;
        let line = match Self::encode(id, &command) {
            Ok(line) => line,
            Err(e) => {
                self.tracker.forget(id).await;
                return Err(e);
            }
        };

        debug!("Sending request #{}: {}", id, command.description());

        if self.outgoing.send(line).await.is_err() {
            self.tracker.forget(id).await;
            return Err(Error::channel_send("extension stdin"));
        }

        match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(outcome)) => {
                debug!("Request #{} completed: success={}", id, outcome.is_ok());
                outcome
            }
            Ok(Err(_)) => Err(Error::Cancelled),
            Err(_) => {
                self.tracker.forget(id).await;
                warn!(
                    "Request '{}' timed out after {:?}",
                    command.description(),
                    timeout
                );
                Err(Error::timeout(command.method()))
            }
        }
    }

    /// Send a command without waiting for (or tracking) a response.
    ///
    /// Only commands that change state qualify; a query without its answer
    /// is rejected with [`Error::InvalidArgument`].
    pub async fn send_fire_and_forget(&self, command: ServiceCommand) -> Result<()> {
        if !command.is_mutating() {
            return Err(Error::invalid_argument(format!(
                "'{}' is a query and needs a response",
                command.method()
            )));
        }
        let id = next_request_id();
        let line = Self::encode(id, &command)?;

        debug!("Sending fire-and-forget #{}: {}", id, command.description());

        self.outgoing
            .send(line)
            .await
            .map_err(|_| Error::channel_send("extension stdin"))
    }

    /// Route one line of extension output.
    ///
    /// Responses complete their pending request and yield `None`; events are
    /// handed back to the caller.
    pub async fn handle_line(&self, line: &str) -> Result<Option<EventMessage>> {
        match Message::parse(line)? {
            Message::Response(response) => {
                let id = response.id;
                if !self.tracker.handle_response(response).await {
                    debug!("Unmatched response #{}", id);
                }
                Ok(None)
            }
            Message::Event(event) => Ok(Some(event)),
            Message::Request(request) => Err(Error::protocol(format!(
                "unexpected request from extension: {}",
                request.method
            ))),
        }
    }

    /// Fail every pending request with [`Error::Cancelled`]
    pub async fn shutdown(&self) {
        self.tracker.cancel_all().await;
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }
}

/// Periodically fail requests nobody collected, until the tracker is gone
async fn sweep_stale_requests(tracker: Weak<RequestTracker>) {
    let mut cleanup_interval = tokio::time::interval(STALE_REQUEST_CLEANUP_INTERVAL);
    cleanup_interval.tick().await;

    loop {
        cleanup_interval.tick().await;
        let Some(tracker) = tracker.upgrade() else {
            break;
        };
        let stale = tracker.cleanup_stale(STALE_REQUEST_TIMEOUT).await;
        if !stale.is_empty() {
            debug!("Cleaned up {} stale request(s): {:?}", stale.len(), stale);
        }
    }
}

fn expect_bool(value: Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::protocol(format!("expected a boolean result, got {}", value)))
}

impl ServiceControl for ServiceClient {
    async fn start_service(&self, interval: Option<f64>) -> Result<bool> {
        expect_bool(self.send(ServiceCommand::Start { interval }).await?)
    }

    async fn stop_service(&self) -> Result<bool> {
        expect_bool(self.send(ServiceCommand::Stop).await?)
    }

    async fn pause_service(&self) -> Result<bool> {
        expect_bool(self.send(ServiceCommand::Pause).await?)
    }

    async fn get_status(&self) -> Result<StatusSnapshot> {
        let value = self.send(ServiceCommand::GetStatus).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_counter(&self) -> Result<u64> {
        let value = self.send(ServiceCommand::GetCounter).await?;
        value
            .as_u64()
            .ok_or_else(|| Error::protocol(format!("expected an integer result, got {}", value)))
    }

    async fn reset_counter(&self) -> Result<bool> {
        expect_bool(self.send(ServiceCommand::ResetCounter).await?)
    }

    async fn set_configuration(&self, update: ConfigurationUpdate) -> Result<bool> {
        expect_bool(self.send(ServiceCommand::SetConfiguration(update)).await?)
    }

    async fn trigger_custom_event(
        &self,
        event_name: &str,
        data: Option<Map<String, Value>>,
    ) -> Result<bool> {
        expect_bool(
            self.send(ServiceCommand::TriggerCustomEvent {
                event_name: event_name.to_string(),
                data,
            })
            .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Answer every request on `rx` with `reply(method)` via the client
    fn spawn_responder(
        client: ServiceClient,
        mut rx: mpsc::Receiver<String>,
        reply: impl Fn(&Request) -> Response + Send + 'static,
    ) {
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                let Ok(Message::Request(request)) = Message::parse(&line) else {
                    continue;
                };
                let response = Message::from(reply(&request)).encode().unwrap();
                client.handle_line(&response).await.unwrap();
            }
        });
    }

    #[test]
    fn test_request_id_uniqueness() {
        let id1 = next_request_id();
        let id2 = next_request_id();
        assert!(id2 > id1);
    }

    #[tokio::test]
    async fn test_request_tracker_handle_response() {
        let tracker = RequestTracker::new();
        let (id, rx) = tracker.register("get_counter").await;
        assert_eq!(tracker.pending_count().await, 1);

        assert!(tracker.handle_response(Response::success(id, json!(3))).await);
        assert_eq!(rx.await.unwrap().unwrap(), json!(3));
        assert_eq!(tracker.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_request_tracker_unmatched_response() {
        let tracker = RequestTracker::new();
        assert!(!tracker.handle_response(Response::success(9999, json!({}))).await);
    }

    #[tokio::test]
    async fn test_request_tracker_remote_error() {
        let tracker = RequestTracker::new();
        let (id, rx) = tracker.register("start_service").await;
        tracker
            .handle_response(Response::failure(id, &Error::invalid_argument("bad")))
            .await;
        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Remote { code: 400, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_tracker_cleanup_stale() {
        let tracker = RequestTracker::new();
        let (_id, rx) = tracker.register("get_status").await;

        tokio::time::sleep(Duration::from_millis(20)).await;

        let stale = tracker.cleanup_stale(Duration::from_millis(10)).await;
        assert_eq!(stale.len(), 1);
        assert_eq!(tracker.pending_count().await, 0);
        assert!(matches!(rx.await.unwrap(), Err(Error::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_request_tracker_cancel_all() {
        let tracker = RequestTracker::new();
        let (_id1, rx1) = tracker.register("stop_service").await;
        let (_id2, rx2) = tracker.register("pause_service").await;

        tracker.cancel_all().await;

        assert_eq!(tracker.pending_count().await, 0);
        assert!(matches!(rx1.await.unwrap(), Err(Error::Cancelled)));
        assert!(matches!(rx2.await.unwrap(), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_client_typed_results() {
        let (tx, rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);
        spawn_responder(client.clone(), rx, |request| match request.method.as_str() {
            "get_counter" => Response::success(request.id, json!(7)),
            "start_service" => {
                assert_eq!(request.params["interval"], 0.5);
                assert_eq!(request.control, Some(Control::Service));
                Response::success(request.id, json!(true))
            }
            other => Response::failure(request.id, &Error::not_found(other)),
        });

        assert!(client.start_service(Some(0.5)).await.unwrap());
        assert_eq!(client.get_counter().await.unwrap(), 7);

        let err = client.stop_service().await.unwrap_err();
        assert!(matches!(err, Error::Remote { code: 404, .. }));
    }

    #[tokio::test]
    async fn test_client_rejects_wrong_result_type() {
        let (tx, rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);
        spawn_responder(client.clone(), rx, |request| {
            Response::success(request.id, json!("yes"))
        });

        let err = client.pause_service().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_timeout() {
        let (tx, _rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx).with_timeout(Duration::from_millis(10));

        let err = client.get_status().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(client.tracker().pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_client_fire_and_forget() {
        let (tx, mut rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);

        client
            .send_fire_and_forget(ServiceCommand::ResetCounter)
            .await
            .unwrap();

        let sent = rx.try_recv().unwrap();
        assert!(sent.contains("reset_counter"));
        assert_eq!(client.tracker().pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_fire_and_forget_rejects_queries() {
        let (tx, mut rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);

        for query in [ServiceCommand::GetStatus, ServiceCommand::GetCounter] {
            let err = client.send_fire_and_forget(query).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_is_swept() {
        let (tx, _rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);

        // a caller that gives up without the client noticing
        let abandoned = {
            let client = client.clone();
            tokio::spawn(async move { client.get_counter().await })
        };
        while client.tracker().pending_count().await == 0 {
            tokio::task::yield_now().await;
        }
        abandoned.abort();
        assert_eq!(client.tracker().pending_count().await, 1);

        tokio::time::sleep(STALE_REQUEST_TIMEOUT / 2).await;
        assert_eq!(client.tracker().pending_count().await, 1);

        tokio::time::sleep(STALE_REQUEST_TIMEOUT).await;
        assert_eq!(client.tracker().pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_client_channel_closed() {
        let (tx, rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);
        drop(rx);

        let err = client.stop_service().await.unwrap_err();
        assert!(matches!(err, Error::ChannelSend { .. }));
        assert_eq!(client.tracker().pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_client_shutdown_cancels_pending() {
        let (tx, _rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);

        let pending = {
            let client = client.clone();
            tokio::spawn(async move { client.reset_counter().await })
        };
        while client.tracker().pending_count().await == 0 {
            tokio::task::yield_now().await;
        }
        client.shutdown().await;

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_handle_line_returns_events() {
        let (tx, _rx) = mpsc::channel::<String>(32);
        let client = ServiceClient::new(tx);

        let event = client
            .handle_line(r#"[{"event":"counter_update","control":"service","params":{"count":1}}]"#)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event, "counter_update");
        assert_eq!(event.params["count"], 1);

        assert!(client.handle_line(r#"{"id":1,"method":"x"}"#).await.is_err());
        assert!(client.handle_line("nonsense").await.is_err());
    }
}
