pub mod config;
pub mod http;
pub mod relay;
pub mod twiml;
