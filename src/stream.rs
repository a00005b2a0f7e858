//! Streaming reply decoding.
//!
//! Turns a chunked HTTP body into a lazy sequence of text fragments. The
//! sequence is finite (it ends with the body) and cannot be restarted: it
//! consumes the response it reads from.

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::decode::Utf8Decoder;
use crate::error::{ChatError, Result};

/// Boxed stream of decoded reply fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Controls for a single response stream.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Cancelling this token ends the stream with [`ChatError::Cancelled`].
    pub cancel: CancellationToken,
    /// Longest wait for the next chunk before failing with [`ChatError::Timeout`].
    pub idle_timeout: Option<Duration>,
}

/// Decode a streamed response body into text fragments.
pub fn stream_response(response: reqwest::Response, options: StreamOptions) -> FragmentStream {
    decode_stream(response.bytes_stream().map_err(ChatError::from), options)
}

/// Decode any byte-chunk stream into text fragments.
///
/// Empty fragments (a chunk holding only the start of a character) are not
/// yielded. A sequence left unfinished at end of stream is flushed as U+FFFD.
pub fn decode_stream<S, B>(bytes: S, options: StreamOptions) -> FragmentStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::try_stream! {
        let mut decoder = Utf8Decoder::new();

        futures::pin_mut!(bytes);
        while let Some(chunk) = next_chunk(&mut bytes, &options).await? {
            let chunk = chunk.as_ref();
            trace!(name: "chat.stream.chunk", bytes = chunk.len(), "Chunk received");

            let text = decoder.decode(chunk);
            if !text.is_empty() {
                yield text;
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            yield tail;
        }
    };

    Box::pin(out)
}

/// Wait for the next chunk, honouring cancellation and the idle limit.
async fn next_chunk<S, B>(bytes: &mut Pin<&mut S>, options: &StreamOptions) -> Result<Option<B>>
where
    S: Stream<Item = Result<B>>,
{
    let read = async {
        match options.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, bytes.next())
                .await
                .map_err(|_elapsed| ChatError::Timeout(limit)),
            None => Ok(bytes.next().await),
        }
    };

    tokio::select! {
        biased;
        () = options.cancel.cancelled() => Err(ChatError::Cancelled),
        read = read => read?.transpose(),
    }
}
