use crate::domain::errors::SourceError;
use crate::domain::value_objects::{ContentKind, Url};
use anyhow::{Result, anyhow};
use bytes::Bytes;
use futures::stream::BoxStream;
use hyper::header::HeaderMap;
use hyper::{StatusCode, Version};
use std::fmt;
use std::str::FromStr;

/// HTTP method enum for simplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            other => Err(anyhow!("Unsupported HTTP method: '{}'", other)),
        }
    }
}

impl From<Method> for hyper::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => hyper::Method::GET,
            Method::Post => hyper::Method::POST,
            Method::Put => hyper::Method::PUT,
            Method::Delete => hyper::Method::DELETE,
            Method::Patch => hyper::Method::PATCH,
            Method::Head => hyper::Method::HEAD,
            Method::Options => hyper::Method::OPTIONS,
        }
    }
}

/// Pull-based supplier of request body chunks for large payloads.
pub type ChunkStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// How the request body is packaged for the transport.
pub enum BodyPlan {
    None,
    /// Fully held in memory. `content_type` is set only when sniffing ran.
    Buffered {
        body: Bytes,
        content_type: Option<ContentKind>,
    },
    Streamed(ChunkStream),
}

impl fmt::Debug for BodyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyPlan::None => f.write_str("None"),
            BodyPlan::Buffered { body, content_type } => f
                .debug_struct("Buffered")
                .field("len", &body.len())
                .field("content_type", content_type)
                .finish(),
            BodyPlan::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// Represents a fully built HTTP request, ready for the transport
#[derive(Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: BodyPlan,
}

/// Status line and headers of a response, delivered before any body fragment
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: StatusCode,
    pub headers: HeaderMap,
}
