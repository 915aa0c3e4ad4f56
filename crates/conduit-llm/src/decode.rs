//! Response decoding: one JSON message, or a lazy SSE sequence
//!
//! Streams are pull-based. Nothing is read from the transport until the
//! consumer polls, and each poll checks the cancellation token before
//! touching the body, so no delta is yielded once the token has fired.

use std::future::ready;
use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::convert::openai::{chat_chunk_to_delta, fim_chunk_to_text, legacy_chunk_to_text};
use crate::dispatch::cancellable;
use crate::error::LlmError;
use crate::protocol::openai::{ChatResponse, LegacyStreamChunk, StreamChunk};
use crate::types::{Message, MessageDelta};

/// Lazy sequence of chat deltas
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<MessageDelta, LlmError>> + Send>>;

/// Lazy sequence of text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Non-standard status some gateways return when the client went away
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// SSE payload marking the end of a stream
const DONE_MARKER: &str = "[DONE]";

/// Decode a non-streaming chat response into its single message
///
/// Returns `Ok(None)` for a 499 status or when `cancel` fires while the body
/// is being read.
pub async fn decode_message(response: Response, cancel: &CancellationToken) -> Result<Option<Message>, LlmError> {
    if response.status().as_u16() == CLIENT_CLOSED_REQUEST {
        tracing::debug!("backend reported the request as aborted");
        return Ok(None);
    }

    let Some(response) = ensure_success(response, cancel).await? else {
        return Ok(None);
    };
    let Some(body) = read_body(response, cancel).await? else {
        return Ok(None);
    };

    let parsed: ChatResponse = serde_json::from_str(&body)
        .map_err(|e| LlmError::MalformedResponse(format!("failed to parse response: {e}")))?;

    let message = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| LlmError::MalformedResponse("response has no `choices[0].message`".to_owned()))?;

    Ok(Some(message.into()))
}

/// Pass a successful response through, or turn it into a transport error
///
/// The error carries the response body verbatim.
pub async fn ensure_success(response: Response, cancel: &CancellationToken) -> Result<Option<Response>, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(Some(response));
    }

    let Some(body) = read_body(response, cancel).await? else {
        return Ok(None);
    };
    Err(transport_error(status, body))
}

/// [`ensure_success`] for calls that cannot be cancelled
pub async fn require_success(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .map_err(|e| LlmError::Upstream(format!("failed to read response body: {e}")))?;
    Err(transport_error(status, body))
}

fn transport_error(status: StatusCode, body: String) -> LlmError {
    tracing::warn!(status = status.as_u16(), "backend returned error");
    LlmError::Transport {
        status: status.as_u16(),
        body,
    }
}

/// Read the whole body as text unless `cancel` fires first
pub async fn read_body(response: Response, cancel: &CancellationToken) -> Result<Option<String>, LlmError> {
    let read = async {
        response
            .text()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to read response body: {e}")))
    };
    cancellable(read, cancel).await
}

/// Chat-completions stream: one delta per chunk with text or tool-call data
pub fn chat_deltas(response: Response, cancel: &CancellationToken) -> DeltaStream {
    sse(response, cancel, |data| {
        parse_chunk::<StreamChunk>(data).and_then(|chunk| chat_chunk_to_delta(&chunk))
    })
}

/// Legacy completions stream: `choices[0].text`, end-of-sequence skipped
pub fn legacy_text(response: Response, cancel: &CancellationToken) -> TextStream {
    sse(response, cancel, |data| {
        parse_chunk::<LegacyStreamChunk>(data).and_then(|chunk| legacy_chunk_to_text(&chunk))
    })
}

/// Fill-in-middle stream: `choices[0].delta.content`
pub fn fim_text(response: Response, cancel: &CancellationToken) -> TextStream {
    sse(response, cancel, |data| {
        parse_chunk::<StreamChunk>(data).and_then(|chunk| fim_chunk_to_text(&chunk))
    })
}

/// Frame the body as SSE and map each event payload through `decode`
///
/// Events that decode to `None` are skipped. The sequence ends at the
/// `[DONE]` marker, at end of body, or when `cancel` fires.
fn sse<T, F>(response: Response, cancel: &CancellationToken, decode: F) -> Pin<Box<dyn Stream<Item = Result<T, LlmError>> + Send>>
where
    T: Send + 'static,
    F: Fn(&str) -> Option<T> + Send + 'static,
{
    let events = response
        .bytes_stream()
        .eventsource()
        .take_while(|event| ready(!matches!(event, Ok(event) if event.data.trim() == DONE_MARKER)))
        .filter_map(move |event| {
            ready(match event {
                Ok(event) => decode(event.data.trim()).map(Ok),
                Err(e) => Some(Err(LlmError::Streaming(e.to_string()))),
            })
        })
        .take_until(cancel.clone().cancelled_owned());

    Box::pin(events)
}

fn parse_chunk<T: DeserializeOwned>(data: &str) -> Option<T> {
    serde_json::from_str(data)
        .inspect_err(|e| tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk"))
        .ok()
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    fn sse_response(status: u16, body: &str) -> Response {
        let response = http_response(status, "text/event-stream", body);
        Response::from(response)
    }

    fn http_response(status: u16, content_type: &str, body: &str) -> http::Response<String> {
        http::Response::builder()
            .status(status)
            .header("content-type", content_type)
            .body(body.to_owned())
            .unwrap()
    }

    fn json_response(status: u16, body: &str) -> Response {
        Response::from(http_response(status, "application/json", body))
    }

    const CHAT_EVENTS: &str = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: not json\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"late\"}}]}\n\n",
    );

    #[tokio::test]
    async fn chat_stream_keeps_order_and_stops_at_done() {
        let cancel = CancellationToken::new();
        let deltas: Vec<_> = chat_deltas(sse_response(200, CHAT_EVENTS), &cancel)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(deltas, vec![MessageDelta::assistant("Hel"), MessageDelta::assistant("lo")]);
    }

    #[tokio::test]
    async fn cancelled_stream_yields_nothing_more() {
        let cancel = CancellationToken::new();
        let mut stream = chat_deltas(sse_response(200, CHAT_EVENTS), &cancel);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content, "Hel");

        cancel.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn legacy_stream_skips_end_of_sequence() {
        let body = concat!(
            "data: {\"choices\":[{\"text\":\"Once\"}]}\n\n",
            "data: {\"choices\":[{\"text\":\" upon\"}]}\n\n",
            "data: {\"choices\":[{\"text\":\"</s>\",\"finish_reason\":\"eos\"}]}\n\n",
        );
        let cancel = CancellationToken::new();
        let text: Vec<_> = legacy_text(sse_response(200, body), &cancel).try_collect().await.unwrap();

        assert_eq!(text, ["Once", " upon"]);
    }

    #[tokio::test]
    async fn fim_stream_reads_delta_content() {
        let body = concat!(
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"a, b\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\")\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let cancel = CancellationToken::new();
        let text: Vec<_> = fim_text(sse_response(200, body), &cancel).try_collect().await.unwrap();

        assert_eq!(text, ["a, b", ")"]);
    }

    #[tokio::test]
    async fn message_is_read_from_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}]}"#;
        let cancel = CancellationToken::new();

        let message = decode_message(json_response(200, body), &cancel).await.unwrap();
        assert_eq!(message, Some(Message::assistant("hi")));
    }

    #[tokio::test]
    async fn status_499_is_an_empty_result() {
        let cancel = CancellationToken::new();
        let message = decode_message(json_response(499, ""), &cancel).await.unwrap();
        assert!(message.is_none());
    }

    #[tokio::test]
    async fn missing_choice_is_malformed() {
        let cancel = CancellationToken::new();
        let err = decode_message(json_response(200, r#"{"choices":[]}"#), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let cancel = CancellationToken::new();
        let err = decode_message(json_response(500, "overloaded"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Transport { status: 500, .. }));
        assert_eq!(err.to_string(), "overloaded");
    }
}
