use crate::domain::errors::ConfigError;
use crate::infrastructure::chunked_reader::DEFAULT_BUFFER_SIZE;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Name of the configuration file looked up in the home and working directories.
pub const CONFIG_FILENAME: &str = ".crestconfig.json";

/// Fully merged, read-only configuration for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub auto_populate_headers: bool,
    pub auto_detect_content_type: bool,
    pub is_private: bool,
    pub show_response_headers: bool,
    pub pretty_print: bool,
    /// Headers from configuration files.
    pub extra_headers: HeaderMap,
    /// Headers given on the command line. Always applied last.
    pub override_headers: HeaderMap,
    /// Drop `extra_headers` when assembling the request.
    pub suppress_config_headers: bool,
    pub url_prefix: Option<String>,
    pub input_buffer_size: usize,
    pub timeout: Option<Duration>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            auto_populate_headers: true,
            auto_detect_content_type: true,
            is_private: false,
            show_response_headers: false,
            pretty_print: true,
            extra_headers: HeaderMap::new(),
            override_headers: HeaderMap::new(),
            suppress_config_headers: false,
            url_prefix: None,
            input_buffer_size: DEFAULT_BUFFER_SIZE,
            timeout: None,
        }
    }
}

/// One configuration file. Keys that are absent leave the value below untouched.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigLayer {
    pub auto_populate_request_headers: Option<bool>,
    pub auto_recognize_request_content: Option<bool>,
    pub private: Option<bool>,
    pub show_response_headers: Option<bool>,
    pub pretty_print: Option<bool>,
    pub request_headers: Option<BTreeMap<String, String>>,
    #[serde(rename = "URLPrefix")]
    pub url_prefix: Option<String>,
    pub input_stream_buffer_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl ConfigLayer {
    /// Reads a layer from `path`. A missing file is not an error.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let location = path.display().to_string();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: location,
                    source,
                });
            }
        };
        let layer = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: location.clone(),
            source,
        })?;
        debug!("loaded configuration from {}", location);
        Ok(Some(layer))
    }
}

/// Settings taken from command-line flags, applied on top of every file.
#[derive(Debug, Default, Clone)]
pub struct CommandLineOverrides {
    pub no_auto_headers: bool,
    pub headers: Vec<(String, String)>,
    pub show_response_headers: Option<bool>,
    pub pretty_print: Option<bool>,
}

impl ResolvedConfig {
    /// Loads `filename` from the home directory, then the working directory,
    /// then applies the command-line overrides.
    pub fn load(overrides: &CommandLineOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for path in config_paths(CONFIG_FILENAME) {
            if let Some(layer) = ConfigLayer::read(&path)? {
                config.apply_layer(layer)?;
            }
        }
        config.apply_overrides(overrides)?;
        debug!(?config, "resolved configuration");
        Ok(config)
    }

    pub fn apply_layer(&mut self, layer: ConfigLayer) -> Result<(), ConfigError> {
        if let Some(value) = layer.auto_populate_request_headers {
            self.auto_populate_headers = value;
        }
        if let Some(value) = layer.auto_recognize_request_content {
            self.auto_detect_content_type = value;
        }
        if let Some(value) = layer.private {
            self.is_private = value;
        }
        if let Some(value) = layer.show_response_headers {
            self.show_response_headers = value;
        }
        if let Some(value) = layer.pretty_print {
            self.pretty_print = value;
        }
        if let Some(headers) = layer.request_headers {
            merge_headers(&mut self.extra_headers, headers)?;
        }
        if let Some(prefix) = layer.url_prefix {
            self.url_prefix = Some(prefix);
        }
        if let Some(size) = layer.input_stream_buffer_size {
            self.input_buffer_size = size.max(1);
        }
        if let Some(seconds) = layer.timeout_seconds {
            self.timeout = Some(Duration::from_secs(seconds));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &CommandLineOverrides) -> Result<(), ConfigError> {
        if overrides.no_auto_headers {
            self.auto_populate_headers = false;
            self.auto_detect_content_type = false;
            self.suppress_config_headers = true;
        }
        merge_headers(&mut self.override_headers, overrides.headers.iter().cloned())?;
        if let Some(value) = overrides.show_response_headers {
            self.show_response_headers = value;
        }
        if let Some(value) = overrides.pretty_print {
            self.pretty_print = value;
        }
        Ok(())
    }
}

/// Home directory first so the project directory can override it.
fn config_paths(filename: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(filename));
    }
    if let Ok(cwd) = std::env::current_dir() {
        let local = cwd.join(filename);
        if !paths.contains(&local) {
            paths.push(local);
        }
    }
    paths
}

/// Inserts `headers` into `target`, replacing entries whose names match
/// case-insensitively.
fn merge_headers<I>(target: &mut HeaderMap, headers: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|_| ConfigError::InvalidHeader(format!("{name}:{value}")))?;
        target.insert(header_name, header_value);
    }
    Ok(())
}
