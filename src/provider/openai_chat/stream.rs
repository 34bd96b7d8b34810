use futures_util::{StreamExt, future};

use crate::error::ChatError;
use crate::http::HttpBodyStream;
use crate::provider::DeltaStream;
use crate::stream::{SseDecoder, SseEvent};

use super::PROVIDER_ID;
use super::types::OpenAiStreamChunk;

/// Maps an OpenAI SSE body onto the text of `choices[0].delta.content`.
pub(crate) fn create_stream(body: HttpBodyStream) -> DeltaStream {
    let deltas = SseDecoder::new(body, PROVIDER_ID).filter_map(|event| {
        future::ready(match event {
            Ok(SseEvent::Data(data)) => Some(parse_delta(&data)),
            Ok(SseEvent::Done) => None,
            Err(err) => Some(Err(err)),
        })
    });
    Box::pin(deltas)
}

fn parse_delta(data: &str) -> Result<String, ChatError> {
    let chunk: OpenAiStreamChunk =
        serde_json::from_str(data).map_err(|err| ChatError::Stream {
            provider: PROVIDER_ID,
            message: format!("failed to parse stream chunk: {err}"),
        })?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default())
}
