use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content type marking an attachment as an Adaptive Card.
pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";

/// Single event in the conversation transcript.
///
/// Only the fields the relay reads are modeled; the remote sends more.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub r#type: String,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<SuggestedActions>,
}

impl Activity {
    /// Plain text message posted on behalf of the SMS user.
    pub fn message(from_name: &str, text: &str) -> Self {
        Self {
            r#type: "message".into(),
            from: ChannelAccount::user(from_name),
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Submit-action message carrying a structured value instead of text.
    pub fn submit(from_name: &str, value: Value) -> Self {
        Self {
            r#type: "message".into(),
            from: ChannelAccount::user(from_name),
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn is_bot_message(&self) -> bool {
        self.r#type == "message" && self.from.role.as_deref() == Some("bot")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ChannelAccount {
    fn user(name: &str) -> Self {
        Self {
            id: Some("userId".into()),
            name: Some(name.to_string()),
            role: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedActions {
    #[serde(default)]
    pub actions: Vec<CardAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardAction {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Conversation handle returned when a conversation is started.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: String,
    pub token: String,
}

/// Acknowledgement returned for a posted activity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityAck {
    #[serde(default)]
    pub id: Option<String>,
}

/// Ordered transcript page returned by the activity-fetch endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub watermark: Option<String>,
}
