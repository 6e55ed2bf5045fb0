//! Orchestrates one webhook call end to end: token, session lookup or
//! creation, activity post, reply poll, extraction, and the single
//! renewal retry when a cached conversation token has gone stale.

use serde_json::Value;
use smsrelay_directline::{
    Activity, ActivityAck, AuthError, DirectLineClient, TokenClient, TransportError,
};
use smsrelay_extract::{extract, ExtractedReply};
use smsrelay_session::{KeyedLock, SessionEntry, SharedSessionStore};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RelayConfig;

const NO_REPLY: &str = "No response from bot";
const FAREWELL: &str = "Conversation ended.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session store failure: {0}")]
    Store(anyhow::Error),
}

/// How the conversation behind a successful relay was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPath {
    /// First contact: a conversation was started for this sender.
    Started,
    /// The cached conversation accepted the message.
    Resumed,
    /// The cached conversation rejected its token; a fresh one replaced it.
    Renewed,
    /// The sender ended the conversation with the configured sentinel.
    Ended,
}

#[derive(Debug, Clone)]
pub struct RelayReply {
    pub text: String,
    pub path: SessionPath,
}

pub struct Relay {
    tokens: TokenClient,
    transport: DirectLineClient,
    sessions: SharedSessionStore,
    locks: KeyedLock,
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig, sessions: SharedSessionStore) -> Self {
        let http = reqwest::Client::new();
        Self {
            tokens: TokenClient::new(http.clone(), config.identity.clone()),
            transport: DirectLineClient::new(http, config.directline_base.clone()),
            sessions,
            locks: KeyedLock::new(),
            config,
        }
    }

    /// Relays one inbound SMS and returns the text to send back.
    pub async fn handle_inbound(
        &self,
        sender: &str,
        body: &str,
    ) -> Result<RelayReply, RelayError> {
        if self.is_end_of_conversation(body) {
            self.sessions
                .delete(sender)
                .await
                .map_err(RelayError::Store)?;
            info!(sender, "conversation ended by sender");
            return Ok(RelayReply {
                text: FAREWELL.into(),
                path: SessionPath::Ended,
            });
        }

        let _guard = self.locks.acquire(sender).await;
        let bot_token = self.tokens.acquire().await?;

        let (mut entry, mut path) = match self
            .sessions
            .find(sender)
            .await
            .map_err(RelayError::Store)?
        {
            Some(entry) => (entry, SessionPath::Resumed),
            None => (
                self.open_session(sender, &bot_token).await?,
                SessionPath::Started,
            ),
        };

        let outbound = Activity::message(&self.config.identity.name, body);
        let ack = match self
            .transport
            .post_activity(&entry.conversation_id, &entry.token, &outbound)
            .await
        {
            Ok(ack) => ack,
            Err(err) if path == SessionPath::Resumed && err.is_stale_token() => {
                warn!(
                    sender,
                    conversation_id = %entry.conversation_id,
                    error = %err,
                    "conversation token rejected; starting a fresh conversation"
                );
                entry = self.open_session(sender, &bot_token).await?;
                path = SessionPath::Renewed;
                self.transport
                    .post_activity(&entry.conversation_id, &entry.token, &outbound)
                    .await?
            }
            Err(err) => return Err(err.into()),
        };

        let mut reply = self.collect_reply(&entry, ack, body).await?;

        // One auto-submit round when the card asked for one; never loops.
        if let Some(data) = reply.submit.take() {
            let value = merge_submit_body(data, &self.config.card_submit_field, body);
            info!(sender, conversation_id = %entry.conversation_id, "auto-submitting card action");
            let submit = Activity::submit(&self.config.identity.name, value);
            let ack = self
                .transport
                .post_activity(&entry.conversation_id, &entry.token, &submit)
                .await?;
            reply = self.collect_reply(&entry, ack, body).await?;
        }

        Ok(RelayReply {
            text: reply.text.unwrap_or_else(|| NO_REPLY.into()),
            path,
        })
    }

    /// Posts a message on an explicitly named conversation, outside the
    /// per-sender session flow. Used by the send-only endpoint.
    pub async fn send_direct(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<ActivityAck, RelayError> {
        let bot_token = self.tokens.acquire().await?;
        let outbound = Activity::message(&self.config.identity.name, message);
        Ok(self
            .transport
            .post_activity(conversation_id, &bot_token, &outbound)
            .await?)
    }

    fn is_end_of_conversation(&self, body: &str) -> bool {
        body.trim()
            .eq_ignore_ascii_case(self.config.end_conversation_message.trim())
    }

    async fn open_session(
        &self,
        sender: &str,
        bot_token: &str,
    ) -> Result<SessionEntry, RelayError> {
        let conversation = self.transport.start_conversation(bot_token).await?;
        let entry = SessionEntry::new(conversation.conversation_id, conversation.token);
        self.sessions
            .put(sender, entry.clone())
            .await
            .map_err(RelayError::Store)?;
        info!(sender, conversation_id = %entry.conversation_id, "conversation started");
        Ok(entry)
    }

    async fn collect_reply(
        &self,
        entry: &SessionEntry,
        ack: ActivityAck,
        body: &str,
    ) -> Result<ExtractedReply, RelayError> {
        let activities = self
            .transport
            .await_reply(
                &entry.conversation_id,
                &entry.token,
                ack.id.as_deref(),
                &self.config.poll,
            )
            .await?;
        Ok(extract(&activities, body, self.config.extraction_mode))
    }
}

fn merge_submit_body(data: Value, field: &str, body: &str) -> Value {
    let mut map = match data {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    map.insert(field.to_string(), Value::String(body.to_string()));
    Value::Object(map)
}
