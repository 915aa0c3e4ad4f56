//! Mock OpenAI-compatible backend for integration tests
//!
//! Serves chat, legacy completion, fill-in-middle, embeddings and model
//! listing on any path prefix (so Azure deployment paths work too) and
//! records every request it receives.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    /// Header value as text, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// How the backend answers
#[derive(Debug, Clone)]
pub struct Behavior {
    /// Content fragments, one SSE event each
    pub fragments: Vec<String>,
    /// Answer every request with this status and [`FAILURE_BODY`]
    pub status: Option<u16>,
    /// Pause before sending response headers
    pub response_delay: Option<Duration>,
    /// Pause before each SSE event
    pub event_delay: Option<Duration>,
    /// Return embedding items in reverse order (indices stay correct)
    pub reverse_embeddings: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            fragments: ["Hello", " from", " mock"].map(String::from).to_vec(),
            status: None,
            response_delay: None,
            event_delay: None,
            reverse_embeddings: false,
        }
    }
}

/// Body sent with a forced error status
pub const FAILURE_BODY: &str = r#"{"error":{"message":"mock backend failure"}}"#;

/// Model identifiers returned by the listing endpoint
pub const MODEL_IDS: [&str; 2] = ["gpt-4o", "text-embedding-3-small"];

pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    behavior: Behavior,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockBackend {
    /// Start a backend with default behavior
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(Behavior::default()).await
    }

    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            behavior,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL of a standard deployment, including `/v1/`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1/", self.addr)
    }

    /// Root URL, as used by Azure resource endpoints
    pub fn root_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Snapshot of every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The only request received; panics if there were more or fewer
    pub fn single_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request, got {requests:?}");
        requests.into_iter().next().unwrap()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let path = uri.path().to_owned();

    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        headers,
        body: body.clone(),
    });

    let behavior = &state.behavior;

    if let Some(delay) = behavior.response_delay {
        tokio::time::sleep(delay).await;
    }

    if let Some(status) = behavior.status {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, FAILURE_BODY).into_response();
    }

    if path.ends_with("/fim/completions") {
        fim(behavior)
    } else if path.ends_with("/chat/completions") {
        chat(behavior, &body)
    } else if path.ends_with("/completions") {
        legacy(behavior)
    } else if path.ends_with("/embeddings") {
        embeddings(behavior, &body)
    } else if path.ends_with("/models") {
        axum::Json(json!({
            "object": "list",
            "data": MODEL_IDS.map(|id| json!({"id": id, "object": "model", "owned_by": "mock"})),
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn chat(behavior: &Behavior, request: &Value) -> Response {
    let has_tools = request["tools"].as_array().is_some_and(|t| !t.is_empty());

    if request["stream"] != json!(true) {
        let message = if has_tools {
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                }]
            })
        } else {
            json!({"role": "assistant", "content": behavior.fragments.concat()})
        };

        return axum::Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "model": request["model"],
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
        }))
        .into_response();
    }

    let mut events = vec![json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]})];

    if has_tools {
        events.push(json!({"choices": [{"index": 0, "delta": {"tool_calls": [{
            "index": 0,
            "id": "call_1",
            "type": "function",
            "function": {"name": "get_weather", "arguments": ""}
        }]}}]}));
        events.push(json!({"choices": [{"index": 0, "delta": {"tool_calls": [{
            "index": 0,
            "function": {"arguments": "{\"city\":\"Paris\"}"}
        }]}}]}));
    } else {
        events.extend(
            behavior
                .fragments
                .iter()
                .map(|f| json!({"choices": [{"index": 0, "delta": {"content": f}}]})),
        );
    }

    events.push(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}));
    sse(behavior, events)
}

fn legacy(behavior: &Behavior) -> Response {
    let mut events: Vec<Value> = behavior
        .fragments
        .iter()
        .map(|f| json!({"choices": [{"index": 0, "text": f, "finish_reason": null}]}))
        .collect();
    events.push(json!({"choices": [{"index": 0, "text": "</s>", "finish_reason": "eos"}]}));
    sse(behavior, events)
}

fn fim(behavior: &Behavior) -> Response {
    let events = behavior
        .fragments
        .iter()
        .map(|f| json!({"choices": [{"index": 0, "delta": {"content": f}}]}))
        .collect();
    sse(behavior, events)
}

/// Each vector is `[input length, input position]`
fn embeddings(behavior: &Behavior, request: &Value) -> Response {
    let inputs = request["input"].as_array().cloned().unwrap_or_default();

    let mut data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let len = input.as_str().map_or(0, str::len);
            #[allow(clippy::cast_precision_loss)]
            let embedding = [len as f32, index as f32];
            json!({"object": "embedding", "index": index, "embedding": embedding})
        })
        .collect();

    if behavior.reverse_embeddings {
        data.reverse();
    }

    axum::Json(json!({"object": "list", "data": data, "model": request["model"]})).into_response()
}

fn sse(behavior: &Behavior, events: Vec<Value>) -> Response {
    let frames: Vec<String> = events
        .into_iter()
        .map(|event| format!("data: {event}\n\n"))
        .chain(std::iter::once("data: [DONE]\n\n".to_owned()))
        .collect();

    let delay = behavior.event_delay;
    let stream = futures_util::stream::iter(frames).then(move |frame| async move {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok::<_, Infallible>(frame)
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream),
    )
        .into_response()
}
