//! Turns a fetched activity transcript into a single text block an SMS
//! channel can carry: message text with citations stripped, suggested
//! actions as a rendered option list, and adaptive cards flattened to
//! their label/text lines.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use smsrelay_directline::{Activity, Attachment, ADAPTIVE_CARD_CONTENT_TYPE};

/// Citation markers the bot embeds in answer text: a bracketed integer,
/// optionally followed by a colon-prefixed cite reference and quoted title,
/// e.g. `[1]` or `[1]: cite:123 "Title"`.
static CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[\d+\](?:: cite:\d+ "[^"]*")?"#).expect("citation pattern"));

/// Which bot messages contribute primary text to the reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Only the most recent bot message in the batch.
    #[default]
    Latest,
    /// Every bot message whose text differs from the triggering user text.
    All,
}

impl FromStr for ExtractionMode {
    type Err = UnknownModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "all" => Ok(Self::All),
            _ => Err(UnknownModeError(value.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown extraction mode `{0}`; expected `latest` or `all`")]
pub struct UnknownModeError(String);

/// Reply distilled from one activity batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedReply {
    /// Rendered reply text; `None` when the batch produced nothing.
    pub text: Option<String>,
    /// Data payload of an adaptive-card submit action, when one was present.
    pub submit: Option<Value>,
}

/// Distills `activities` into a reply. Suggested actions, attachments, and
/// the submit payload always come from the most recent bot message; `mode`
/// only controls how the primary text is assembled.
pub fn extract(activities: &[Activity], user_text: &str, mode: ExtractionMode) -> ExtractedReply {
    let latest_bot = activities.iter().rev().find(|a| a.is_bot_message());

    let primary = match mode {
        ExtractionMode::Latest => latest_bot
            .and_then(|a| a.text.as_deref())
            .map(strip_citations)
            .filter(|text| !text.is_empty()),
        ExtractionMode::All => {
            let joined = activities
                .iter()
                .filter(|a| a.is_bot_message())
                .filter_map(|a| a.text.as_deref())
                .filter(|text| text.trim() != user_text.trim())
                .map(strip_citations)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            (!joined.is_empty()).then_some(joined)
        }
    };

    let mut sections: Vec<String> = Vec::new();
    if let Some(text) = primary {
        sections.push(text);
    }

    let mut submit = None;
    if let Some(activity) = latest_bot {
        if let Some(block) = suggested_actions_block(activity) {
            sections.push(block);
        }
        let (attachment_sections, submit_data) = flatten_attachments(&activity.attachments);
        sections.extend(attachment_sections);
        submit = submit_data;
    }

    let text = (!sections.is_empty()).then(|| sections.join("\n"));
    ExtractedReply { text, submit }
}

/// Removes citation markers and trims the result. Idempotent.
pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").trim().to_string()
}

fn suggested_actions_block(activity: &Activity) -> Option<String> {
    let actions = &activity.suggested_actions.as_ref()?.actions;
    if actions.is_empty() {
        return None;
    }
    let mut block = String::from("Choose an option:");
    for action in actions {
        block.push_str("\n- ");
        block.push_str(&action.title);
    }
    Some(block)
}

fn flatten_attachments(attachments: &[Attachment]) -> (Vec<String>, Option<Value>) {
    let mut sections = Vec::new();
    let mut submit = None;
    for attachment in attachments {
        if attachment.content_type == ADAPTIVE_CARD_CONTENT_TYPE {
            let Some(content) = &attachment.content else {
                continue;
            };
            let mut lines = Vec::new();
            flatten_card_body(content.get("body"), &mut lines);
            if !lines.is_empty() {
                sections.push(lines.join("\n"));
            }
            if submit.is_none() {
                submit = submit_action_data(content.get("actions"));
            }
        } else if let Some(url) = &attachment.content_url {
            sections.push(url.clone());
        } else if let Some(content) = &attachment.content {
            let inline = content
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| content.to_string());
            sections.push(inline);
        }
    }
    (sections, submit)
}

fn flatten_card_body(body: Option<&Value>, lines: &mut Vec<String>) {
    let Some(items) = body.and_then(Value::as_array) else {
        return;
    };
    for item in items {
        match item.get("items").and_then(Value::as_array) {
            Some(nested) => {
                for sub in nested {
                    push_label_and_text(sub, lines);
                }
            }
            None => push_label_and_text(item, lines),
        }
    }
}

fn push_label_and_text(item: &Value, lines: &mut Vec<String>) {
    for key in ["label", "text"] {
        if let Some(text) = item.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
    }
}

fn submit_action_data(actions: Option<&Value>) -> Option<Value> {
    actions?
        .as_array()?
        .iter()
        .find(|action| action.get("type").and_then(Value::as_str) == Some("Action.Submit"))
        .map(|action| {
            action
                .get("data")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()))
        })
}
