//! Reframes upstream answers into the SSE event envelope

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use tracing::warn;

use crate::chat::events::{sse_line, EventFramer};
use crate::providers::completion::FragmentStream;

pub const FALLBACK_ANSWER: &str =
    "I could not generate a detailed macroeconomic report for this query.";
const STREAM_ERROR_MARKER: &str = "⚠️ The answer stream was interrupted";

/// Either the research output as one finished string or a live fragment
/// sequence from the completion call.
pub enum Answer {
    Complete(String),
    Fragments(FragmentStream),
}

/// Streams the envelope with buffering and caching disabled so fragments
/// reach the browser as they are produced.
pub fn sse_response(answer: Answer) -> Response {
    let mut response = (StatusCode::OK, Body::from_stream(event_lines(answer))).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

/// Emits `text-start`, one delta per piece of answer text in arrival order
/// (no re-buffering or coalescing), then `text-end`. A mid-stream fault is
/// surfaced as one final in-band delta so the envelope still terminates
/// normally, and an answer with no text at all falls back to a fixed
/// sentence so at least one delta is always emitted.
pub fn event_lines(answer: Answer) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    async_stream::stream! {
        let mut framer = EventFramer::new();
        if let Some(event) = framer.start() {
            yield Ok(sse_line(&event));
        }

        let mut emitted = false;
        match answer {
            Answer::Complete(text) => {
                if let Some(event) = framer.delta(&text) {
                    emitted = true;
                    yield Ok(sse_line(&event));
                }
            }
            Answer::Fragments(mut fragments) => {
                while let Some(item) = fragments.next().await {
                    match item {
                        Ok(fragment) => {
                            if let Some(event) = framer.delta(&fragment) {
                                emitted = true;
                                yield Ok(sse_line(&event));
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "completion stream failed mid-flight");
                            let notice = format!("\n\n{STREAM_ERROR_MARKER} ({err}).");
                            if let Some(event) = framer.delta(&notice) {
                                emitted = true;
                                yield Ok(sse_line(&event));
                            }
                            break;
                        }
                    }
                }
            }
        }

        if !emitted {
            if let Some(event) = framer.delta(FALLBACK_ANSWER) {
                yield Ok(sse_line(&event));
            }
        }
        if let Some(event) = framer.end() {
            yield Ok(sse_line(&event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::completion::CompletionError;
    use serde_json::Value;

    async fn collect_events(answer: Answer) -> Vec<Value> {
        let lines: Vec<Bytes> = event_lines(answer)
            .map(|item| item.unwrap())
            .collect()
            .await;
        lines
            .iter()
            .map(|line| {
                let text = std::str::from_utf8(line).unwrap();
                let json = text
                    .strip_prefix("data: ")
                    .and_then(|rest| rest.strip_suffix("\n\n"))
                    .unwrap();
                serde_json::from_str(json).unwrap()
            })
            .collect()
    }

    fn fragments(items: Vec<Result<String, CompletionError>>) -> Answer {
        Answer::Fragments(Box::pin(futures::stream::iter(items)))
    }

    fn delta_text(events: &[Value]) -> String {
        events
            .iter()
            .filter(|event| event["type"] == "text-delta")
            .map(|event| event["delta"].as_str().unwrap())
            .collect()
    }

    fn assert_envelope(events: &[Value]) {
        assert_eq!(events.first().unwrap()["type"], "text-start");
        assert_eq!(events.last().unwrap()["type"], "text-end");
        for event in &events[1..events.len() - 1] {
            assert_eq!(event["type"], "text-delta");
            assert!(!event["delta"].as_str().unwrap().is_empty());
        }
        let id = events[0]["id"].as_str().unwrap();
        assert!(events.iter().all(|event| event["id"] == id));
    }

    #[tokio::test]
    async fn complete_answer_is_a_single_delta() {
        let events = collect_events(Answer::Complete("## Report\nAll good.".to_string())).await;
        assert_eq!(events.len(), 3);
        assert_envelope(&events);
        assert_eq!(delta_text(&events), "## Report\nAll good.");
    }

    #[tokio::test]
    async fn fragments_stream_in_arrival_order() {
        let events = collect_events(fragments(vec![
            Ok("The ".to_string()),
            Ok("rate ".to_string()),
            Ok("held.".to_string()),
        ]))
        .await;
        assert_eq!(events.len(), 5);
        assert_envelope(&events);
        assert_eq!(delta_text(&events), "The rate held.");
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let events = collect_events(fragments(vec![
            Ok("text".to_string()),
            Ok(String::new()),
            Ok("more".to_string()),
        ]))
        .await;
        assert_eq!(events.len(), 4);
        assert_envelope(&events);
    }

    #[tokio::test]
    async fn mid_stream_error_is_surfaced_in_band() {
        let events = collect_events(fragments(vec![
            Ok("partial answer".to_string()),
            Err(CompletionError::Upstream("connection reset".to_string())),
        ]))
        .await;
        assert_envelope(&events);
        let text = delta_text(&events);
        assert!(text.starts_with("partial answer"));
        assert!(text.contains(STREAM_ERROR_MARKER));
        assert!(text.contains("connection reset"));
    }

    #[tokio::test]
    async fn empty_answer_gets_the_fallback_delta() {
        let events = collect_events(fragments(vec![])).await;
        assert_eq!(events.len(), 3);
        assert_envelope(&events);
        assert_eq!(delta_text(&events), FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn blank_complete_answer_gets_the_fallback_delta() {
        let events = collect_events(Answer::Complete(String::new())).await;
        assert_eq!(delta_text(&events), FALLBACK_ANSWER);
        assert_envelope(&events);
    }
}
