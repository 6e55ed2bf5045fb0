use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use smsrelay_directline::{
    Activity, AuthError, BotIdentity, DirectLineClient, PollPolicy, TokenClient, TransportError,
};

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn identity(token_endpoint: String) -> BotIdentity {
    BotIdentity {
        name: "Support Bot".into(),
        bot_id: "bot-1".into(),
        tenant_id: "tenant-1".into(),
        token_endpoint,
    }
}

fn fast_policy() -> PollPolicy {
    PollPolicy {
        initial: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        deadline: Duration::from_millis(1_000),
    }
}

#[tokio::test]
async fn acquire_sends_identity_and_returns_token() {
    let router = Router::new().route(
        "/token",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            assert_eq!(params.get("botId").map(String::as_str), Some("bot-1"));
            assert_eq!(params.get("tenantId").map(String::as_str), Some("tenant-1"));
            Json(json!({"token": "tok1"}))
        }),
    );
    let base = spawn(router).await;

    let client = TokenClient::new(reqwest::Client::new(), identity(format!("{base}/token")));
    assert_eq!(client.acquire().await.unwrap(), "tok1");
}

#[tokio::test]
async fn acquire_surfaces_upstream_status_and_body() {
    let router = Router::new().route(
        "/token",
        get(|| async { (StatusCode::FORBIDDEN, "bad credentials") }),
    );
    let base = spawn(router).await;

    let client = TokenClient::new(reqwest::Client::new(), identity(format!("{base}/token")));
    match client.acquire().await {
        Err(AuthError::Upstream { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "bad credentials");
        }
        other => panic!("expected upstream auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn acquire_rejects_empty_token() {
    let router = Router::new().route("/token", get(|| async { Json(json!({"token": ""})) }));
    let base = spawn(router).await;

    let client = TokenClient::new(reqwest::Client::new(), identity(format!("{base}/token")));
    assert!(matches!(client.acquire().await, Err(AuthError::EmptyToken)));
}

#[tokio::test]
async fn start_post_fetch_roundtrip_carries_bearer_tokens() {
    let router = Router::new()
        .route(
            "/conversations",
            post(|headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer tok1"
                );
                Json(json!({"conversationId": "conv1", "token": "ctok1"}))
            }),
        )
        .route(
            "/conversations/{id}/activities",
            post(
                |Path(id): Path<String>, headers: HeaderMap, Json(activity): Json<Value>| async move {
                    assert_eq!(id, "conv1");
                    assert_eq!(
                        headers.get("authorization").unwrap().to_str().unwrap(),
                        "Bearer ctok1"
                    );
                    assert_eq!(activity["text"], "Hello");
                    Json(json!({"id": "act-1"}))
                },
            )
            .get(|| async {
                Json(json!({
                    "activities": [
                        {"id": "act-1", "type": "message", "from": {"role": "user"}, "text": "Hello"},
                        {"id": "act-2", "type": "message", "from": {"role": "bot"}, "text": "Hi"},
                    ],
                    "watermark": "2",
                }))
            }),
        );
    let base = spawn(router).await;

    let client = DirectLineClient::new(reqwest::Client::new(), base);
    let conversation = client.start_conversation("tok1").await.unwrap();
    assert_eq!(conversation.conversation_id, "conv1");
    assert_eq!(conversation.token, "ctok1");

    let ack = client
        .post_activity("conv1", "ctok1", &Activity::message("Support Bot", "Hello"))
        .await
        .unwrap();
    assert_eq!(ack.id.as_deref(), Some("act-1"));

    let set = client.fetch_activities("conv1", "ctok1").await.unwrap();
    assert_eq!(set.activities.len(), 2);
    assert!(set.activities[1].is_bot_message());
}

#[tokio::test]
async fn rejected_post_surfaces_stale_token() {
    let router = Router::new().route(
        "/conversations/{id}/activities",
        post(|| async {
            (
                StatusCode::FORBIDDEN,
                "Token not valid for this conversation",
            )
        }),
    );
    let base = spawn(router).await;

    let client = DirectLineClient::new(reqwest::Client::new(), base);
    let err = client
        .post_activity("conv1", "stale", &Activity::message("Support Bot", "Hello"))
        .await
        .unwrap_err();
    assert!(err.is_stale_token());
    match err {
        TransportError::Upstream { status, .. } => assert_eq!(status, 403),
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn await_reply_polls_until_bot_message_appears() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/conversations/{id}/activities",
            get(|State(fetches): State<Arc<AtomicUsize>>| async move {
                let seen = fetches.fetch_add(1, Ordering::SeqCst) + 1;
                let mut activities = vec![json!(
                    {"id": "act-1", "type": "message", "from": {"role": "user"}, "text": "Hello"}
                )];
                if seen >= 3 {
                    activities.push(json!(
                        {"id": "act-2", "type": "message", "from": {"role": "bot"}, "text": "Hi"}
                    ));
                }
                Json(json!({"activities": activities}))
            }),
        )
        .with_state(fetches.clone());
    let base = spawn(router).await;

    let client = DirectLineClient::new(reqwest::Client::new(), base);
    let activities = client
        .await_reply("conv1", "ctok1", Some("act-1"), &fast_policy())
        .await
        .unwrap();

    assert!(activities.iter().any(Activity::is_bot_message));
    assert!(fetches.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn await_reply_gives_up_at_the_deadline() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/conversations/{id}/activities",
            get(|State(fetches): State<Arc<AtomicUsize>>| async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                Json(json!({"activities": [
                    {"id": "act-1", "type": "message", "from": {"role": "user"}, "text": "Hello"}
                ]}))
            }),
        )
        .with_state(fetches.clone());
    let base = spawn(router).await;

    let client = DirectLineClient::new(reqwest::Client::new(), base);
    let policy = PollPolicy {
        initial: Duration::from_millis(10),
        max_interval: Duration::from_millis(20),
        deadline: Duration::from_millis(60),
    };
    let activities = client
        .await_reply("conv1", "ctok1", Some("act-1"), &policy)
        .await
        .unwrap();

    assert!(!activities.iter().any(Activity::is_bot_message));
    assert!(fetches.load(Ordering::SeqCst) >= 2);
}
