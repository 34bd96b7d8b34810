use futures_util::{StreamExt, future};

use crate::error::ChatError;
use crate::http::HttpBodyStream;
use crate::provider::DeltaStream;
use crate::stream::{SseDecoder, SseEvent};

use super::PROVIDER_ID;
use super::types::GeminiGenerateContentResponse;

/// Maps a `streamGenerateContent?alt=sse` body onto the first candidate's text per chunk.
pub(crate) fn create_stream(body: HttpBodyStream) -> DeltaStream {
    let deltas = SseDecoder::new(body, PROVIDER_ID).filter_map(|event| {
        future::ready(match event {
            Ok(SseEvent::Data(data)) => Some(parse_chunk(&data)),
            Ok(SseEvent::Done) => None,
            Err(err) => Some(Err(err)),
        })
    });
    Box::pin(deltas)
}

fn parse_chunk(data: &str) -> Result<String, ChatError> {
    let chunk: GeminiGenerateContentResponse =
        serde_json::from_str(data).map_err(|err| ChatError::Stream {
            provider: PROVIDER_ID,
            message: format!("failed to parse stream chunk: {err}"),
        })?;
    Ok(chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.text())
        .unwrap_or_default())
}
