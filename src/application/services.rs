use crate::application::response_consumer::ResponseConsumer;
use crate::domain::entities::{RequestSpec, ResponseHead};
use crate::domain::errors::{OperationError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

/// A response as handed over by the transport: the head, then body fragments.
pub struct TransportResponse {
    pub head: ResponseHead,
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

/// Trait for HTTP transports to enable mocking and dependency inversion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: RequestSpec) -> Result<TransportResponse, TransportError>;
}

/// Application service for running one request/response exchange
pub struct HttpRequestService {
    transport: Box<dyn Transport>,
    timeout: Option<Duration>,
}

impl HttpRequestService {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Bounds the whole exchange, from connecting to the last body fragment.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `request` and feeds the response to `consumer`.
    ///
    /// Returns the outcome recorded by the consumer: a transport error, a
    /// non-success status, or success.
    pub async fn send_request<W: Write>(
        &self,
        request: RequestSpec,
        mut consumer: ResponseConsumer<W>,
    ) -> Result<(), OperationError> {
        debug!("{} {}", hyper::Method::from(request.method), request.url.as_str());
        match self.timeout {
            Some(limit) => {
                let exchange = self.exchange(request, &mut consumer);
                if tokio::time::timeout(limit, exchange).await.is_err() {
                    consumer.on_error(TransportError::Timeout(limit));
                }
            }
            None => self.exchange(request, &mut consumer).await,
        }
        consumer.finish()
    }

    async fn exchange<W: Write>(&self, request: RequestSpec, consumer: &mut ResponseConsumer<W>) {
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                consumer.on_error(err);
                return;
            }
        };

        consumer.on_head(&response.head);
        debug!(
            state = ?consumer.state(),
            pretty = consumer.is_pretty_print_eligible(),
            "response head consumed"
        );
        let mut body = response.body;
        while !consumer.is_done() {
            match body.next().await {
                Some(Ok(fragment)) => consumer.on_body_fragment(&fragment),
                Some(Err(err)) => consumer.on_error(err),
                None => consumer.on_complete(),
            }
        }
    }
}
