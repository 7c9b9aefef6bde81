use crate::application::services::{Transport, TransportResponse};
use crate::domain::entities::{BodyPlan, RequestSpec, ResponseHead};
use crate::domain::errors::{SourceError, TransportError};
use crate::domain::value_objects::Url;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::client::conn::http1::{self, SendRequest};
use hyper::{Request as HyperRequest, Response as HyperResponse};
use hyper_util::rt::TokioIo;
use std::error::Error as _;
use tokio::net::TcpStream;
use tokio_native_tls::{TlsConnector, native_tls};
use tracing::debug;

/// Request body as sent over the wire: buffered or streamed from the input.
type RequestBody = UnsyncBoxBody<Bytes, SourceError>;

/// Infrastructure implementation of Transport using Hyper
///
/// Opens one connection per request, over TLS for https URLs, and hands
/// the response back as soon as the head arrives so the body can be
/// consumed as it streams in.
#[derive(Debug, Default)]
pub struct HyperHttpClient;

impl HyperHttpClient {
    pub fn new() -> Self {
        Self
    }

    async fn connect(&self, url: &Url) -> Result<SendRequest<RequestBody>, TransportError> {
        let authority = url.host_and_port();
        let host = url.host().trim_start_matches('[').trim_end_matches(']');
        let tcp = TcpStream::connect((host, url.port()))
            .await
            .map_err(|source| TransportError::Connect {
                authority: authority.clone(),
                source,
            })?;
        debug!("connected to {}", authority);

        if url.is_https() {
            let connector = TlsConnector::from(native_tls::TlsConnector::new()?);
            let stream = connector.connect(host, tcp).await?;
            Self::handshake(TokioIo::new(stream)).await
        } else {
            Self::handshake(TokioIo::new(tcp)).await
        }
    }

    async fn handshake<I>(io: I) -> Result<SendRequest<RequestBody>, TransportError>
    where
        I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let (sender, connection) = http1::handshake(io)
            .await
            .map_err(TransportError::Handshake)?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!("connection closed with error: {}", err);
            }
        });
        Ok(sender)
    }
}

#[async_trait]
impl Transport for HyperHttpClient {
    async fn execute(&self, request: RequestSpec) -> Result<TransportResponse, TransportError> {
        let mut sender = self.connect(&request.url).await?;
        let hyper_request = RequestAdapter::to_hyper_request(request)?;
        let hyper_response = sender
            .send_request(hyper_request)
            .await
            .map_err(|err| match upload_failure(&err) {
                Some(source) => TransportError::Upload(source),
                None => TransportError::Http(err),
            })?;
        Ok(ResponseAdapter::to_transport_response(hyper_response))
    }
}

/// Finds a failed request body read in the cause chain of a hyper error.
fn upload_failure(err: &hyper::Error) -> Option<SourceError> {
    let mut cause = err.source();
    while let Some(current) = cause {
        if let Some(source) = current.downcast_ref::<SourceError>() {
            return Some(source.detached());
        }
        cause = current.source();
    }
    None
}

/// Adapter for converting domain requests to Hyper requests
struct RequestAdapter;

impl RequestAdapter {
    fn to_hyper_request(request: RequestSpec) -> Result<HyperRequest<RequestBody>, TransportError> {
        let mut hyper_request = HyperRequest::builder()
            .method(hyper::Method::from(request.method))
            .uri(request.url.origin_form())
            .body(BodyAdapter::to_hyper_body(request.body))?;
        *hyper_request.headers_mut() = request.headers;
        Ok(hyper_request)
    }
}

/// Adapter for converting domain request bodies to Hyper bodies
struct BodyAdapter;

impl BodyAdapter {
    fn to_hyper_body(body: BodyPlan) -> RequestBody {
        match body {
            BodyPlan::None => Empty::new().map_err(|never| match never {}).boxed_unsync(),
            BodyPlan::Buffered { body, .. } => {
                Full::new(body).map_err(|never| match never {}).boxed_unsync()
            }
            BodyPlan::Streamed(chunks) => StreamBody::new(chunks.map_ok(Frame::data)).boxed_unsync(),
        }
    }
}

/// Adapter for exposing Hyper responses as a head plus a fragment stream
struct ResponseAdapter;

impl ResponseAdapter {
    fn to_transport_response(response: HyperResponse<Incoming>) -> TransportResponse {
        let (parts, body) = response.into_parts();
        let head = ResponseHead {
            version: parts.version,
            status: parts.status,
            headers: parts.headers,
        };
        let fragments = TryStreamExt::map_err(body.into_data_stream(), TransportError::Body);
        let body = StreamExt::boxed(fragments);
        TransportResponse { head, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Method;
    use futures::stream;
    use hyper::body::Body;
    use hyper::header::{HOST, HeaderMap, HeaderValue};
    use std::io;
    use tokio::io::AsyncReadExt;

    fn spec(body: BodyPlan) -> RequestSpec {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("example.com:80"));
        RequestSpec {
            method: Method::Post,
            url: Url::new("http://example.com/upload?x=1").unwrap(),
            headers,
            body,
        }
    }

    #[test]
    fn requests_use_origin_form_and_keep_headers() {
        let request = RequestAdapter::to_hyper_request(spec(BodyPlan::None)).unwrap();
        assert_eq!(request.method(), &hyper::Method::POST);
        assert_eq!(request.uri(), "/upload?x=1");
        assert_eq!(request.headers()[HOST], "example.com:80");
        assert_eq!(request.body().size_hint().exact(), Some(0));
    }

    #[test]
    fn buffered_bodies_have_a_known_length() {
        let body = BodyPlan::Buffered {
            body: Bytes::from_static(b"hello"),
            content_type: None,
        };
        let request = RequestAdapter::to_hyper_request(spec(body)).unwrap();
        assert_eq!(request.body().size_hint().exact(), Some(5));
    }

    #[tokio::test]
    async fn streamed_bodies_forward_every_chunk() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
        ])
        .boxed();
        let request = RequestAdapter::to_hyper_request(spec(BodyPlan::Streamed(chunks))).unwrap();
        assert_eq!(request.body().size_hint().exact(), None);

        let collected = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"abcdef");
    }

    #[tokio::test]
    async fn unreachable_hosts_are_connect_errors() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::new(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = HyperHttpClient::new().connect(&url).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn failing_uploads_report_the_source_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0; 1024];
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        });

        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"first chunk")),
            Err(SourceError::Read(io::Error::other("stdin vanished"))),
        ])
        .boxed();
        let mut request = spec(BodyPlan::Streamed(chunks));
        request.url = Url::new(&format!("http://127.0.0.1:{port}/upload")).unwrap();

        match HyperHttpClient::new().execute(request).await {
            Err(TransportError::Upload(SourceError::Read(err))) => {
                assert_eq!(err.to_string(), "stdin vanished");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("the upload should have failed"),
        }
    }
}
