use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use smsrelay_directline::{BotIdentity, PollPolicy};
use smsrelay_extract::ExtractionMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Process configuration. The five identity/sentinel variables are
/// required and the process refuses to start without them; everything
/// else has a default.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub identity: BotIdentity,
    pub end_conversation_message: String,
    pub bind: SocketAddr,
    pub directline_base: String,
    pub extraction_mode: ExtractionMode,
    pub card_submit_field: String,
    pub poll: PollPolicy,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| env::var(key).ok())
    }

    fn load(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let identity = BotIdentity {
            name: required(&get, "BOT_NAME")?,
            bot_id: required(&get, "BOT_ID")?,
            tenant_id: required(&get, "TENANT_ID")?,
            token_endpoint: required(&get, "BOT_TOKEN_ENDPOINT")?,
        };
        let end_conversation_message = required(&get, "END_CONVERSATION_MESSAGE")?;

        let bind = get("BIND")
            .unwrap_or_else(|| "0.0.0.0:5157".into())
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND",
                reason: err.to_string(),
            })?;
        let directline_base = get("DIRECT_LINE_BASE")
            .unwrap_or_else(|| "https://europe.directline.botframework.com/v3/directline".into());
        let extraction_mode = match get("EXTRACTION_MODE") {
            Some(raw) => raw.parse().map_err(
                |err: smsrelay_extract::UnknownModeError| ConfigError::Invalid {
                    key: "EXTRACTION_MODE",
                    reason: err.to_string(),
                },
            )?,
            None => ExtractionMode::default(),
        };
        let card_submit_field = get("CARD_SUBMIT_TEXT_FIELD").unwrap_or_else(|| "text".into());
        let poll = PollPolicy {
            initial: millis(&get, "REPLY_POLL_INITIAL_MS", 500)?,
            max_interval: millis(&get, "REPLY_POLL_MAX_MS", 4_000)?,
            deadline: millis(&get, "REPLY_POLL_DEADLINE_MS", 15_000)?,
        };

        Ok(Self {
            identity,
            end_conversation_message,
            bind,
            directline_base,
            extraction_mode,
            card_submit_field,
            poll,
        })
    }
}

fn required(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    get(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn millis(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match get(key) {
        Some(raw) => raw
            .parse()
            .map(Duration::from_millis)
            .map_err(|err: std::num::ParseIntError| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            }),
        None => Ok(Duration::from_millis(default)),
    }
}
