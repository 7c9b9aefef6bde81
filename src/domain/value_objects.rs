use crate::domain::errors::ParameterError;
use hyper::http::Uri;
use hyper::http::uri::Scheme;

/// Represents a validated, absolute http(s) URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url(pub Uri);

impl Url {
    /// Creates a new Url with validation
    ///
    /// # Arguments
    /// * `url` - The URL string to parse. It must carry an http or https scheme.
    ///
    /// # Returns
    /// * `Ok(Url)` - Validated URL
    /// * `Err(ParameterError)` - If the URL is unparsable or uses another scheme
    pub fn new(url: &str) -> Result<Self, ParameterError> {
        if let Some(scheme) = scheme_of(url) {
            if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
                return Err(ParameterError::UnsupportedScheme(scheme.to_string()));
            }
        }
        let uri = url
            .parse::<Uri>()
            .map_err(|_| ParameterError::InvalidUrl(url.to_string()))?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(ParameterError::InvalidUrl(url.to_string()));
        }
        Ok(Url(uri))
    }

    /// Resolves a user supplied URL, prepending `prefix` when the URL has no scheme.
    pub fn resolve(raw: &str, prefix: Option<&str>) -> Result<Self, ParameterError> {
        match (scheme_of(raw), prefix) {
            (None, Some(prefix)) => Self::new(&format!("{prefix}{raw}")),
            _ => Self::new(raw),
        }
    }

    /// Returns the URL as a string
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }

    pub fn is_https(&self) -> bool {
        self.0.scheme() == Some(&Scheme::HTTPS)
    }

    pub fn host(&self) -> &str {
        self.0.host().unwrap_or_default()
    }

    /// Explicit port, or the scheme's default.
    pub fn port(&self) -> u16 {
        self.0
            .port_u16()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }

    /// `host:port`, as sent in the mandatory `Host` header.
    pub fn host_and_port(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// The request target for an origin server: path and query only.
    pub fn origin_form(&self) -> Uri {
        let target = self
            .0
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|pq| !pq.is_empty())
            .unwrap_or("/");
        target.parse().unwrap_or_else(|_| Uri::from_static("/"))
    }
}

/// Returns the scheme of `raw` when it is written as `scheme://...`.
fn scheme_of(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once("://")?;
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Classification of a payload by its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Xml,
    Text,
}

impl ContentKind {
    /// The `Content-Type` value announced for this kind of payload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentKind::Json => "application/json",
            ContentKind::Xml => "application/xml",
            ContentKind::Text => "text/plain",
        }
    }

    /// Maps a response `Content-Type` onto a pretty-printable kind.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim_start().to_ascii_lowercase();
        if content_type.starts_with("application/json") {
            Some(ContentKind::Json)
        } else if content_type.starts_with("application/xml")
            || content_type.starts_with("text/xml")
        {
            Some(ContentKind::Xml)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_urls_are_used_as_given() {
        let url = Url::resolve("https://example.com/a?b=c", Some("http://ignored")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?b=c");
        assert!(url.is_https());
        assert_eq!(url.port(), 443);
        assert_eq!(url.host_and_port(), "example.com:443");
    }

    #[test]
    fn schemeless_urls_get_the_prefix() {
        let url = Url::resolve("/users/7", Some("http://localhost:8080/api")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/users/7");
        assert_eq!(url.host_and_port(), "localhost:8080");
        assert_eq!(url.origin_form(), "/api/users/7");
    }

    #[test]
    fn schemeless_url_without_prefix_is_rejected() {
        assert!(matches!(
            Url::resolve("/users", None),
            Err(ParameterError::InvalidUrl(_))
        ));
    }

    #[test]
    fn other_schemes_are_rejected() {
        match Url::resolve("ftp://example.com/file", None) {
            Err(ParameterError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "ftp"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_not_a_url() {
        assert!(matches!(
            Url::new("http://exa mple.com"),
            Err(ParameterError::InvalidUrl(_))
        ));
    }

    #[test]
    fn origin_form_defaults_to_root() {
        let url = Url::new("http://example.com").unwrap();
        assert_eq!(url.origin_form(), "/");
        assert_eq!(url.port(), 80);
    }

    #[test]
    fn pretty_printable_content_types() {
        assert_eq!(
            ContentKind::from_content_type("application/json; charset=utf-8"),
            Some(ContentKind::Json)
        );
        assert_eq!(ContentKind::from_content_type("text/xml"), Some(ContentKind::Xml));
        assert_eq!(ContentKind::from_content_type("application/xml"), Some(ContentKind::Xml));
        assert_eq!(ContentKind::from_content_type("text/html"), None);
    }
}
