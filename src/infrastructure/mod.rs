pub mod chunked_reader;
pub mod config;
pub mod content_sniffer;
pub mod http_client;
pub mod logging;
pub mod output;
pub mod platform;
