//! Transport layer for JSON-RPC communication

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::RpcError;

/// Transport trait for RPC communication (object-safe)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an RPC request and get the JSON `result`
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;

    /// Human-readable endpoint, used in log lines
    fn endpoint(&self) -> &str;
}

type Handler = Arc<dyn Fn(&[Value]) -> Result<Value, RpcError> + Send + Sync>;

enum Scripted {
    Reply(Result<Value, RpcError>),
    Handler(Handler),
}

#[derive(Default)]
struct MockState {
    queued: HashMap<String, VecDeque<Result<Value, RpcError>>>,
    handlers: HashMap<String, Handler>,
    fixed: HashMap<String, Value>,
    calls: Vec<(String, Vec<Value>)>,
    delay: Option<Duration>,
}

/// Scripted transport standing in for a client.
///
/// Replies are looked up per method in this order: one-shot queue, handler,
/// fixed response. Anything else answers "method not found". Clones share the
/// same script and call log, so a test can keep a handle after giving one to
/// a session.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an empty mock
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_response("test_setChainParams", Value::Bool(true));
        mock
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        // Poisoning only happens when a test already panicked
        let mut state = self.state.lock().expect("MockTransport mutex poisoned");
        f(&mut state)
    }

    /// Answer every call to `method` with `response`
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn set_response(&self, method: &str, response: Value) {
        self.with_state(|s| {
            s.fixed.insert(method.to_string(), response);
        });
    }

    /// Answer the next call to `method` with `response`
    pub fn push_response(&self, method: &str, response: Value) {
        self.with_state(|s| {
            s.queued
                .entry(method.to_string())
                .or_default()
                .push_back(Ok(response));
        });
    }

    /// Fail the next call to `method` with a JSON-RPC error
    pub fn push_error(&self, method: &str, code: i64, message: &str) {
        self.with_state(|s| {
            s.queued
                .entry(method.to_string())
                .or_default()
                .push_back(Err(RpcError::Rpc {
                    code,
                    message: message.to_string(),
                }));
        });
    }

    /// Compute replies to `method` from the call parameters
    pub fn set_handler<F>(&self, method: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.with_state(|s| {
            s.handlers.insert(method.to_string(), Arc::new(handler));
        });
    }

    /// Sleep before every reply
    pub fn set_delay(&self, delay: Duration) {
        self.with_state(|s| s.delay = Some(delay));
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.with_state(|s| s.calls.clone())
    }

    /// Number of calls received for `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|(m, _)| m == method).count())
    }

    /// Drop the call log, keep the script
    pub fn clear_calls(&self) {
        self.with_state(|s| s.calls.clear());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let (reply, delay) = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| RpcError::Transport("MockTransport mutex poisoned".to_string()))?;
            state.calls.push((method.to_string(), params.clone()));

            let queued = state.queued.get_mut(method).and_then(VecDeque::pop_front);
            let reply = match queued {
                Some(reply) => Scripted::Reply(reply),
                None => match state.handlers.get(method) {
                    Some(handler) => Scripted::Handler(Arc::clone(handler)),
                    None => Scripted::Reply(state.fixed.get(method).cloned().ok_or_else(|| RpcError::Rpc {
                        code: -32601,
                        message: format!("Method not found: {}", method),
                    })),
                },
            };
            (reply, state.delay)
        };
        // Handlers run outside the lock so a panicking one leaves the script usable
        let reply = match reply {
            Scripted::Reply(reply) => reply,
            Scripted::Handler(handler) => handler(&params),
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    fn endpoint(&self) -> &str {
        "mock"
    }
}

/// HTTP transport for a real client
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // A missing result is a legal `null` reply
        Ok(response.result.unwrap_or(Value::Null))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}
