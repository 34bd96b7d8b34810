use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::ChatError;
use crate::http::HttpBodyStream;

/// Payload-level server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Joined `data:` lines of one event.
    Data(String),
    /// The `[DONE]` sentinel used by OpenAI-compatible servers.
    Done,
}

/// Splits an HTTP body into [`SseEvent`]s.
///
/// Only `data:` fields are kept; comments, `event:` and `id:` lines are dropped. The
/// decoder ends after `[DONE]` or when the body closes, whichever comes first.
pub struct SseDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    ready: VecDeque<Result<SseEvent, ChatError>>,
    provider: &'static str,
    body_closed: bool,
    finished: bool,
}

impl SseDecoder {
    pub fn new(body: HttpBodyStream, provider: &'static str) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            ready: VecDeque::new(),
            provider,
            body_closed: false,
            finished: false,
        }
    }

    fn push_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            self.dispatch();
            return;
        }
        if let Some(rest) = line.strip_prefix(b"data:") {
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            self.data_lines.push(rest.to_vec());
        }
    }

    fn dispatch(&mut self) {
        if self.data_lines.is_empty() {
            return;
        }
        let joined = self.data_lines.drain(..).collect::<Vec<_>>().join(&b'\n');
        if joined.is_empty() {
            return;
        }
        let event = match String::from_utf8(joined) {
            Ok(data) if data.trim() == "[DONE]" => {
                self.finished = true;
                Ok(SseEvent::Done)
            }
            Ok(data) => Ok(SseEvent::Data(data)),
            Err(err) => Err(ChatError::Stream {
                provider: self.provider,
                message: format!("invalid UTF-8 in stream chunk: {err}"),
            }),
        };
        self.ready.push_back(event);
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }
}

impl Stream for SseDecoder {
    type Item = Result<SseEvent, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.finished || this.body_closed {
                return Poll::Ready(None);
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    while !this.finished {
                        let Some(line) = this.next_line() else { break };
                        this.push_line(&line);
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.body_closed = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.body_closed = true;
                    if !this.buffer.is_empty() {
                        let tail = std::mem::take(&mut this.buffer);
                        this.push_line(&tail);
                    }
                    this.dispatch();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Drains a body that is known to carry an error payload.
///
/// Invalid UTF-8 is replaced rather than rejected so the HTTP status still decides the
/// error variant.
pub(crate) async fn collect_body_text(mut body: HttpBodyStream) -> Result<String, ChatError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn body(chunks: Vec<Result<Vec<u8>, ChatError>>) -> HttpBodyStream {
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn emits_data_then_done_and_stops() {
        let mut decoder = SseDecoder::new(
            body(vec![
                Ok(b"data: {\"text\":\"hi\"}\n\n".to_vec()),
                Ok(b"data: [DONE]\n\ndata: ignored\n\n".to_vec()),
            ]),
            "test",
        );

        let first = decoder.next().await.expect("event").expect("ok");
        assert_eq!(first, SseEvent::Data("{\"text\":\"hi\"}".to_string()));
        assert_eq!(decoder.next().await.expect("event").expect("ok"), SseEvent::Done);
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn joins_multiline_payloads_split_across_chunks() {
        let mut decoder = SseDecoder::new(
            body(vec![
                Ok(b"event: delta\r\ndata: line one\r\nda".to_vec()),
                Ok(b"ta: line two\r\n\r\n".to_vec()),
            ]),
            "test",
        );
        let event = decoder.next().await.expect("event").expect("ok");
        assert_eq!(event, SseEvent::Data("line one\nline two".to_string()));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn flushes_trailing_event_without_blank_line() {
        let mut decoder = SseDecoder::new(body(vec![Ok(b"data: tail".to_vec())]), "test");
        let event = decoder.next().await.expect("event").expect("ok");
        assert_eq!(event, SseEvent::Data("tail".to_string()));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn reports_invalid_utf8_as_stream_error() {
        let mut decoder = SseDecoder::new(body(vec![Ok(b"data: \xff\n\n".to_vec())]), "test");
        match decoder.next().await.expect("event") {
            Err(ChatError::Stream { provider, .. }) => assert_eq!(provider, "test"),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_body_with_invalid_utf8_is_decoded_lossily() {
        let text = collect_body_text(body(vec![
            Ok(b"{\"error\":\"bad ".to_vec()),
            Ok(b"\xff\"}".to_vec()),
        ]))
        .await
        .expect("body");
        assert_eq!(text, "{\"error\":\"bad \u{fffd}\"}");
    }

    #[tokio::test]
    async fn forwards_transport_errors_and_ends() {
        let mut decoder = SseDecoder::new(
            body(vec![Err(ChatError::transport("connection reset"))]),
            "test",
        );
        assert!(matches!(
            decoder.next().await,
            Some(Err(ChatError::Transport { .. }))
        ));
        assert!(decoder.next().await.is_none());
    }
}
