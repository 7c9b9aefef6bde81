use crate::application::builders::header_assembler;
use crate::domain::entities::{BodyPlan, ChunkStream, Method, RequestSpec};
use crate::domain::errors::{OperationError, ParameterError, SourceError};
use crate::domain::value_objects::{ContentKind, Url};
use crate::infrastructure::chunked_reader::ChunkedReader;
use crate::infrastructure::config::ResolvedConfig;
use crate::infrastructure::content_sniffer;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use std::io::{self, Read};
use tracing::debug;

pub struct RequestBuilder<'a> {
    config: &'a ResolvedConfig,
    method: Method,
    url: Option<Url>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self {
            config,
            method: Method::Get,
            url: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Resolves `raw_url` against the configured URL prefix.
    pub fn url(mut self, raw_url: &str) -> Result<Self, ParameterError> {
        let url = Url::resolve(raw_url, self.config.url_prefix.as_deref())?;
        debug!("resolved URL {} to {}", raw_url, url.as_str());
        self.url = Some(url);
        Ok(self)
    }

    /// Reads the body from `body_source` and produces the finished request.
    ///
    /// A source that fills the first read buffer is streamed to the server
    /// chunk by chunk. Anything smaller is read into memory and, when it is
    /// text and content detection is on, given a sniffed `Content-Type`.
    pub fn build<R>(self, body_source: R) -> Result<RequestSpec, OperationError>
    where
        R: Read + Send + 'static,
    {
        let url = self.url.ok_or(OperationError::MissingUrl)?;
        let mut reader = ChunkedReader::open(body_source, self.config.input_buffer_size)?;

        let (body, content_type) = if reader.is_empty() {
            debug!("no request body");
            (BodyPlan::None, None)
        } else if reader.is_large() {
            debug!("streaming request body");
            (BodyPlan::Streamed(chunk_supplier(reader)), None)
        } else {
            let body = buffered_body(&mut reader, self.config.auto_detect_content_type);
            reader.close();
            let body = body?;
            let content_type = match &body {
                BodyPlan::Buffered { content_type, .. } => *content_type,
                _ => None,
            };
            (body, content_type)
        };

        let headers = header_assembler::assemble(&url, self.config, content_type)?;
        Ok(RequestSpec {
            method: self.method,
            url,
            headers,
            body,
        })
    }
}

/// Takes the single chunk of a small body and sniffs it if it is text.
fn buffered_body<R: Read>(
    reader: &mut ChunkedReader<R>,
    detect_content_type: bool,
) -> Result<BodyPlan, SourceError> {
    let Some(chunk) = reader.next_chunk()? else {
        return Ok(BodyPlan::None);
    };
    let content_type = match std::str::from_utf8(chunk) {
        Ok(_) if detect_content_type => Some(content_sniffer::classify(chunk)),
        _ => None,
    };
    debug!(
        "buffered request body of {} bytes ({})",
        chunk.len(),
        content_type.map_or("untyped", |kind: ContentKind| kind.mime_type())
    );
    Ok(BodyPlan::Buffered {
        body: Bytes::copy_from_slice(chunk),
        content_type,
    })
}

/// Wraps the reader in a stream the transport polls for the next chunk.
///
/// The stream owns the reader and closes it once the source is exhausted
/// or a read fails. Reads are blocking, so each one runs on the blocking pool.
fn chunk_supplier<R>(reader: ChunkedReader<R>) -> ChunkStream
where
    R: Read + Send + 'static,
{
    stream::unfold(Some(reader), |state| async move {
        let Some(mut reader) = state else {
            return None;
        };
        let joined = tokio::task::spawn_blocking(move || {
            let next = reader
                .next_chunk()
                .map(|chunk| chunk.map(Bytes::copy_from_slice));
            (reader, next)
        })
        .await;

        let (mut reader, next) = match joined {
            Ok(pair) => pair,
            Err(err) => return Some((Err(SourceError::Read(io::Error::other(err))), None)),
        };
        match next {
            Ok(Some(chunk)) => {
                debug!("streaming {} byte chunk", chunk.len());
                Some((Ok(chunk), Some(reader)))
            }
            Ok(None) => {
                reader.close();
                None
            }
            Err(err) => {
                reader.close();
                Some((Err(err), None))
            }
        }
    })
    .boxed()
}
