use crate::domain::errors::OperationError;
use crate::domain::value_objects::{ContentKind, Url};
use crate::infrastructure::config::ResolvedConfig;
use crate::infrastructure::platform;
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST, HeaderMap, HeaderValue, USER_AGENT};

const PRODUCT: &str = "Crest";

/// Builds the request header set, layer by layer.
///
/// Each later layer replaces entries of earlier ones whose names match
/// case-insensitively, so the final set holds one entry per name.
pub struct HeaderAssembler {
    headers: HeaderMap,
}

impl HeaderAssembler {
    /// Starts with the mandatory `Host: host:port` header.
    pub fn new(url: &Url) -> Result<Self, OperationError> {
        let host = url.host_and_port();
        let value =
            HeaderValue::from_str(&host).map_err(|_| OperationError::InvalidHeader(host.clone()))?;
        let mut headers = HeaderMap::new();
        headers.insert(HOST, value);
        Ok(Self { headers })
    }

    /// Adds `User-Agent` and `Accept: */*` when `auto_populate` is set.
    pub fn defaults(mut self, auto_populate: bool, private: bool) -> Self {
        if auto_populate {
            self.headers.insert(USER_AGENT, user_agent(private));
            self.headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        }
        self
    }

    /// Announces the sniffed body type, if there is one.
    pub fn content_type(mut self, kind: Option<ContentKind>) -> Self {
        if let Some(kind) = kind {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(kind.mime_type()));
        }
        self
    }

    /// Applies a layer of headers, replacing any existing entries of the same name.
    pub fn layer(mut self, layer: &HeaderMap) -> Self {
        for name in layer.keys() {
            self.headers.remove(name);
            for value in layer.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
        self
    }

    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

/// Assembles the headers for a request to `url` under `config`.
///
/// Precedence, lowest first: `Host`, automatic defaults, the sniffed
/// `Content-Type`, configuration headers (unless suppressed), command-line
/// headers.
pub fn assemble(
    url: &Url,
    config: &ResolvedConfig,
    content_type: Option<ContentKind>,
) -> Result<HeaderMap, OperationError> {
    let mut assembler = HeaderAssembler::new(url)?
        .defaults(config.auto_populate_headers, config.is_private)
        .content_type(content_type);
    if !config.suppress_config_headers {
        assembler = assembler.layer(&config.extra_headers);
    }
    Ok(assembler.layer(&config.override_headers).build())
}

/// `Crest/<version> (<os>; <os version>; <arch>)`, or just the product name in private mode.
pub fn user_agent(private: bool) -> HeaderValue {
    if private {
        return HeaderValue::from_static(PRODUCT);
    }
    let agent = format!(
        "{}/{} ({}; {}; {})",
        PRODUCT,
        env!("CARGO_PKG_VERSION"),
        platform::operating_system(),
        platform::operating_system_version(),
        platform::hardware()
    );
    HeaderValue::from_str(&agent).unwrap_or_else(|_| HeaderValue::from_static(PRODUCT))
}
