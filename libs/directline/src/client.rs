use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::activity::{Activity, ActivityAck, ActivitySet, Conversation};
use crate::error::TransportError;

/// Poll schedule for waiting on a bot reply after posting an activity.
///
/// The fetch endpoint is polled with exponential backoff until a bot
/// message newer than the posted activity shows up or the deadline
/// elapses. Tests inject millisecond-scale policies.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub initial: Duration,
    pub max_interval: Duration,
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max_interval: Duration::from_millis(4_000),
            deadline: Duration::from_millis(15_000),
        }
    }
}

/// Client for the three conversation operations of the session protocol.
pub struct DirectLineClient {
    http: reqwest::Client,
    base: String,
}

impl DirectLineClient {
    pub fn new(http: reqwest::Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    /// Opens a new conversation, yielding its id and conversation-scoped token.
    pub async fn start_conversation(
        &self,
        bot_token: &str,
    ) -> Result<Conversation, TransportError> {
        let url = format!("{}/conversations", self.base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(bot_token)
            .send()
            .await
            .map_err(TransportError::Request)?;
        read_json(response).await
    }

    /// Posts a message or submit-action activity onto an existing conversation.
    pub async fn post_activity(
        &self,
        conversation_id: &str,
        token: &str,
        activity: &Activity,
    ) -> Result<ActivityAck, TransportError> {
        let response = self
            .http
            .post(self.activities_url(conversation_id))
            .bearer_auth(token)
            .json(activity)
            .send()
            .await
            .map_err(TransportError::Request)?;
        read_json(response).await
    }

    /// Fetches the full ordered transcript of a conversation.
    pub async fn fetch_activities(
        &self,
        conversation_id: &str,
        token: &str,
    ) -> Result<ActivitySet, TransportError> {
        let response = self
            .http
            .get(self.activities_url(conversation_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(TransportError::Request)?;
        read_json(response).await
    }

    /// Polls the transcript until a bot message newer than `after_id`
    /// appears or the policy deadline elapses, returning the last fetched
    /// transcript either way.
    pub async fn await_reply(
        &self,
        conversation_id: &str,
        token: &str,
        after_id: Option<&str>,
        policy: &PollPolicy,
    ) -> Result<Vec<Activity>, TransportError> {
        let started = Instant::now();
        let mut interval = policy.initial;
        loop {
            let set = self.fetch_activities(conversation_id, token).await?;
            let elapsed = started.elapsed();
            if has_reply_after(&set.activities, after_id) || elapsed >= policy.deadline {
                debug!(
                    conversation_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    activities = set.activities.len(),
                    "reply poll finished"
                );
                return Ok(set.activities);
            }
            let remaining = policy.deadline - elapsed;
            sleep(interval.min(remaining)).await;
            interval = (interval * 2).min(policy.max_interval);
        }
    }

    fn activities_url(&self, conversation_id: &str) -> String {
        format!("{}/conversations/{}/activities", self.base, conversation_id)
    }
}

fn has_reply_after(activities: &[Activity], after_id: Option<&str>) -> bool {
    match after_id {
        None => activities.iter().any(Activity::is_bot_message),
        Some(id) => {
            let Some(pos) = activities.iter().position(|a| a.id.as_deref() == Some(id)) else {
                // The posted activity has not surfaced in the transcript yet.
                return false;
            };
            activities[pos + 1..].iter().any(Activity::is_bot_message)
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
    let status = response.status();
    let body = response.text().await.map_err(TransportError::Request)?;
    if !status.is_success() {
        return Err(TransportError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(TransportError::Decode)
}
