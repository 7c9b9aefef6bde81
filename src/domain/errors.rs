use hyper::StatusCode;
use std::io;
use std::time::Duration;

/// The request body source could not be opened or read.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not open the input: {0}")]
    Open(#[source] io::Error),

    #[error("could not read the input: {0}")]
    Read(#[source] io::Error),
}

impl SourceError {
    /// An owned copy of an error seen only by reference, keeping its kind and message.
    pub fn detached(&self) -> Self {
        match self {
            SourceError::Open(err) => SourceError::Open(io::Error::new(err.kind(), err.to_string())),
            SourceError::Read(err) => SourceError::Read(io::Error::new(err.kind(), err.to_string())),
        }
    }
}

/// Network or protocol level failure reported by the transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not connect to {authority}: {source}")]
    Connect {
        authority: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS negotiation failed: {0}")]
    Tls(#[from] tokio_native_tls::native_tls::Error),

    #[error("HTTP handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("HTTP request execution failed: {0}")]
    Http(#[source] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),

    /// The request body stream failed while the request was being sent.
    #[error("request body upload failed: {0}")]
    Upload(#[source] SourceError),

    #[error("the request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to build HTTP request: {0}")]
    InvalidRequest(#[from] http::Error),
}

/// Problems with what the user typed on the command line.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("'{0}' is not a parsable URL")]
    InvalidUrl(String),

    #[error("'{0}' is not a supported scheme")]
    UnsupportedScheme(String),

    #[error("'{0}' is not of the form key:value")]
    InvalidHeader(String),
}

/// Problems loading a configuration layer.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{0}' is not a valid request header")]
    InvalidHeader(String),
}

/// Terminal failures of a single request/response cycle.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("could not read the request body: {0}")]
    BodyRead(#[from] SourceError),

    #[error("operation returned error code {} ({})", .0.as_u16(), .0.canonical_reason().unwrap_or("unknown"))]
    HttpStatus(StatusCode),

    #[error(transparent)]
    Transport(TransportError),

    #[error("'{0}' is not a valid request header")]
    InvalidHeader(String),

    #[error("no URL was supplied")]
    MissingUrl,

    #[error("could not write the response: {0}")]
    Output(#[source] io::Error),
}

impl From<TransportError> for OperationError {
    /// Upload failures come from the body source, not the network.
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Upload(source) => OperationError::BodyRead(source),
            other => OperationError::Transport(other),
        }
    }
}

/// A body fragment that is not valid UTF-8. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("could not decode {byte_count} bytes as text")]
pub struct ContentDecodeError {
    pub byte_count: usize,
}
