use crate::application::builders::request_builder::RequestBuilder;
use crate::application::response_consumer::ResponseConsumer;
use crate::application::services::HttpRequestService;
use crate::domain::entities::{Method, RequestSpec};
use crate::domain::errors::ParameterError;
use crate::infrastructure::config::{CommandLineOverrides, ResolvedConfig};
use crate::infrastructure::http_client::HyperHttpClient;
use anyhow::Result;
use clap::Parser;
use std::io::{self, IsTerminal, Read};
use std::str::FromStr;

/// CLI configuration for Crest
#[derive(Parser, Debug)]
#[command(name = "crest", version)]
#[command(
    about = "A utility for communicating with REST-ish services.",
    long_about = "A utility for communicating with REST-ish services.\n\n\
                  The request body, if any, is read from standard input. Defaults are read \
                  from .crestconfig.json in the home directory and then in the current \
                  directory; command-line options override both."
)]
pub struct Cli {
    /// The URL of the service to contact.
    pub url: String,

    /// The HTTP method.
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Additional request headers of the form name:value
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Show or hide the response headers
    #[arg(long, value_name = "true|false")]
    pub show_response_headers: Option<bool>,

    /// Turn the pretty printing on or off
    #[arg(long, value_name = "true|false")]
    pub pretty_print: Option<bool>,

    /// Turn off the auto-population of headers.
    #[arg(long)]
    pub no_auto_headers: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let config = ResolvedConfig::load(&self.overrides()?)?;
        let request_service =
            HttpRequestService::new(Box::new(HyperHttpClient::new())).with_timeout(config.timeout);
        self.perform(&config, &request_service).await
    }

    /// Builds the request from standard input and streams the response to standard output.
    pub async fn perform(
        &self,
        config: &ResolvedConfig,
        request_service: &HttpRequestService,
    ) -> Result<()> {
        let method = Method::from_str(&self.method)?;
        let raw_url = self.url.clone();
        let build_config = config.clone();
        // Opening the input reads the first buffer, which blocks on stdin.
        let request = tokio::task::spawn_blocking(move || -> Result<RequestSpec> {
            Ok(RequestBuilder::new(&build_config)
                .method(method)
                .url(&raw_url)?
                .build(body_source())?)
        })
        .await??;

        let consumer = ResponseConsumer::new(config, io::stdout());
        request_service.send_request(request, consumer).await?;
        Ok(())
    }

    fn overrides(&self) -> Result<CommandLineOverrides, ParameterError> {
        Ok(CommandLineOverrides {
            no_auto_headers: self.no_auto_headers,
            headers: parse_headers(&self.headers)?,
            show_response_headers: self.show_response_headers,
            pretty_print: self.pretty_print,
        })
    }
}

/// Standard input, unless it is a terminal nobody is typing a body into.
fn body_source() -> Box<dyn Read + Send> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        Box::new(io::empty())
    } else {
        Box::new(stdin)
    }
}

/// Splits `name:value` arguments at the first colon.
fn parse_headers(raw_headers: &[String]) -> Result<Vec<(String, String)>, ParameterError> {
    raw_headers
        .iter()
        .map(|raw| match raw.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ParameterError::InvalidHeader(raw.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_split_at_the_first_colon() {
        let parsed = parse_headers(&[
            "Accept: application/json".to_string(),
            "Authorization:Basic a:b".to_string(),
        ])
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Basic a:b".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for raw in ["no-colon", ":value-only"] {
            match parse_headers(&[raw.to_string()]) {
                Err(ParameterError::InvalidHeader(header)) => assert_eq!(header, raw),
                other => panic!("unexpected result for {raw}: {other:?}"),
            }
        }
    }

    #[test]
    fn flags_map_onto_overrides() {
        let cli = Cli::parse_from([
            "crest",
            "-m",
            "post",
            "-H",
            "X-Trace: abc",
            "--show-response-headers",
            "true",
            "--pretty-print",
            "false",
            "--no-auto-headers",
            "http://localhost/",
        ]);
        assert_eq!(cli.method, "post");
        let overrides = cli.overrides().unwrap();
        assert!(overrides.no_auto_headers);
        assert_eq!(overrides.show_response_headers, Some(true));
        assert_eq!(overrides.pretty_print, Some(false));
        assert_eq!(overrides.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
    }

    #[test]
    fn boolean_overrides_default_to_unset() {
        let cli = Cli::parse_from(["crest", "http://localhost/"]);
        assert_eq!(cli.method, "GET");
        let overrides = cli.overrides().unwrap();
        assert!(!overrides.no_auto_headers);
        assert!(overrides.show_response_headers.is_none());
        assert!(overrides.pretty_print.is_none());
        assert!(overrides.headers.is_empty());
    }
}
