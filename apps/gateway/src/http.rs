use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::relay::{Relay, RelayError};
use crate::twiml;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

pub fn build_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/sms/webhook", post(handle_sms))
        .route("/sms/send", post(handle_send))
        .route("/healthz", get(healthz))
        .with_state(AppState { relay })
}

/// Carrier webhook payload; Twilio posts `From`/`Body` as form fields.
#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(rename = "From")]
    from: Option<String>,
    #[serde(rename = "Body")]
    body: Option<String>,
}

async fn handle_sms(State(state): State<AppState>, Form(form): Form<SmsForm>) -> Response {
    let (Some(from), Some(body)) = (non_empty(form.from), non_empty(form.body)) else {
        warn!("sms webhook rejected: missing From or Body");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields: From, Body"})),
        )
            .into_response();
    };

    match state.relay.handle_inbound(&from, &body).await {
        Ok(reply) => {
            info!(sender = %from, path = ?reply.path, "sms relayed");
            (
                [(header::CONTENT_TYPE, "text/xml")],
                twiml::message_response(&reply.text),
            )
                .into_response()
        }
        Err(err) => {
            error!(sender = %from, error = %err, "relay failed");
            (
                error_status(&err),
                Json(json!({
                    "success": false,
                    "message": format!("Failed to relay message to bot: {err}"),
                })),
            )
                .into_response()
        }
    }
}

/// Send-only payload for posting onto an already-known conversation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    conversation_id: Option<String>,
    message: Option<String>,
}

async fn handle_send(State(state): State<AppState>, Json(request): Json<SendRequest>) -> Response {
    let (Some(conversation_id), Some(message)) = (
        non_empty(request.conversation_id),
        non_empty(request.message),
    ) else {
        warn!("send rejected: missing conversationId or message");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields: conversationId, message"})),
        )
            .into_response();
    };

    match state.relay.send_direct(&conversation_id, &message).await {
        Ok(ack) => Json(json!({"success": true, "response": ack.id})).into_response(),
        Err(err) => {
            error!(conversation_id = %conversation_id, error = %err, "send failed");
            (
                error_status(&err),
                Json(json!({
                    "success": false,
                    "message": "Failed to send message to bot",
                    "error": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_status(err: &RelayError) -> StatusCode {
    match err {
        RelayError::Auth(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_treated_as_absent() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("+1555".into())), Some("+1555".into()));
    }

    #[test]
    fn auth_failures_map_to_bad_gateway() {
        let err = RelayError::Auth(smsrelay_directline::AuthError::EmptyToken);
        assert_eq!(error_status(&err), StatusCode::BAD_GATEWAY);

        let err = RelayError::Transport(smsrelay_directline::TransportError::Upstream {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(error_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
