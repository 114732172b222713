use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use folio_core::{Event, EventStream};
use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::relay::{RelayError, RequestLifecycle, Stage};

pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Wire shape of one streamed event
#[derive(Debug, Serialize)]
pub struct SseFrame<'a> {
    pub author: Option<&'a str>,
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
}

impl<'a> SseFrame<'a> {
    pub fn from_event(event: &'a Event) -> Self {
        Self {
            author: event.author.as_deref(),
            is_final: event.is_final_response(),
            text: event.content.as_ref().and_then(|c| c.last_text()),
        }
    }

    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(Bytes::from(format!("data: {json}\n\n")))
    }
}

/// Turn runner events into SSE frames, one per event, then the `[DONE]`
/// sentinel. The next event is only pulled once the previous frame has been
/// taken by the body. An error ends the stream without the sentinel.
pub fn create_sse_stream(
    mut events: EventStream,
    mut lifecycle: RequestLifecycle,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static {
    async_stream::try_stream! {
        lifecycle.advance(Stage::StreamingEvents);
        while let Some(event) = events.next().await {
            let event = event?;
            let frame = SseFrame::from_event(&event).encode()?;
            yield frame;
        }
        lifecycle.advance(Stage::Finalized);
        yield Bytes::from_static(DONE_FRAME);
    }
}

pub fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, RelayError>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    // nginx buffers proxied responses unless told otherwise
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    (headers, Body::from_stream(stream)).into_response()
}
