//! End-to-end tests for the homework relay.
//!
//! A single in-process axum server plays both the review API and the
//! Telegram Bot API, so real HTTP traffic flows through the relay's clients.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use homework_relay::{
    CycleOutcome, HomeworkSource, Notifier, PollPhase, PollState, Poller, PracticumClient,
    RelayError, TelegramNotifier,
};
use serde_json::{json, Value};

const PRACTICUM_TOKEN: &str = "practicum-secret";
const TELEGRAM_TOKEN: &str = "123456:telegram-secret";
const CHAT_ID: &str = "987654";

/// Canned answer for one review API request.
struct ApiReply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl ApiReply {
    fn json(body: &Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }
}

/// What the review API endpoint received.
#[derive(Debug, Clone)]
struct ApiRequest {
    authorization: Option<String>,
    from_date: Option<String>,
}

/// What the bot endpoint received.
#[derive(Debug, Clone)]
struct SentMessage {
    bot_segment: String,
    chat_id: Value,
    text: String,
}

#[derive(Default)]
struct MockInner {
    api_replies: VecDeque<ApiReply>,
    api_requests: Vec<ApiRequest>,
    bot_failure: Option<(StatusCode, Value)>,
    sent: Vec<SentMessage>,
}

#[derive(Clone, Default)]
struct Mock {
    inner: Arc<Mutex<MockInner>>,
}

impl Mock {
    fn push_reply(&self, reply: ApiReply) {
        self.inner.lock().unwrap().api_replies.push_back(reply);
    }

    fn fail_bot(&self, status: StatusCode, body: Value) {
        self.inner.lock().unwrap().bot_failure = Some((status, body));
    }

    fn api_requests(&self) -> Vec<ApiRequest> {
        self.inner.lock().unwrap().api_requests.clone()
    }

    fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().unwrap().sent.clone()
    }
}

async fn homework_statuses(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let reply = {
        let mut inner = mock.inner.lock().unwrap();
        inner.api_requests.push(ApiRequest {
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            from_date: query.get("from_date").cloned(),
        });
        inner.api_replies.pop_front()
    };

    let reply =
        reply.unwrap_or_else(|| ApiReply::json(&json!({"homeworks": [], "current_date": 0})));
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (reply.status, reply.body).into_response()
}

async fn send_message(
    State(mock): State<Mock>,
    Path(bot_segment): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = mock.inner.lock().unwrap();
    if let Some((status, reply)) = inner.bot_failure.clone() {
        return (status, Json(reply)).into_response();
    }
    inner.sent.push(SentMessage {
        bot_segment,
        chat_id: body["chat_id"].clone(),
        text: body["text"].as_str().unwrap_or_default().to_string(),
    });
    Json(json!({"ok": true, "result": {"message_id": inner.sent.len()}})).into_response()
}

/// Spawns the mock server and returns its base URL.
async fn spawn_mock(mock: Mock) -> String {
    let router = Router::new()
        .route("/api/user_api/homework_statuses/", get(homework_statuses))
        .route("/:bot_segment/sendMessage", post(send_message))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr: SocketAddr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    format!("http://{addr}")
}

fn practicum_client(base: &str, timeout: Duration) -> PracticumClient {
    PracticumClient::new(
        format!("{base}/api/user_api/homework_statuses/"),
        PRACTICUM_TOKEN,
        timeout,
    )
    .expect("Failed to build practicum client")
}

fn telegram_notifier(base: &str) -> TelegramNotifier {
    TelegramNotifier::new(base, TELEGRAM_TOKEN, CHAT_ID, Duration::from_secs(5))
        .expect("Failed to build notifier")
}

fn homework_answer(name: &str, status: &str, current_date: i64) -> Value {
    json!({
        "homeworks": [{"id": 1, "homework_name": name, "status": status, "reviewer_comment": ""}],
        "current_date": current_date
    })
}

// ============================================================================
// Review API client
// ============================================================================

#[tokio::test]
async fn test_fetch_sends_oauth_header_and_cursor() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.push_reply(ApiReply::json(&homework_answer("hw01", "approved", 1_700_000_100)));

    let client = practicum_client(&base, Duration::from_secs(5));
    let answer = client.fetch(1_700_000_000).await.expect("fetch failed");

    assert_eq!(answer["current_date"], 1_700_000_100);
    let requests = mock.api_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("OAuth practicum-secret")
    );
    assert_eq!(requests[0].from_date.as_deref(), Some("1700000000"));
}

#[tokio::test]
async fn test_fetch_non_200_is_http_error() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.push_reply(ApiReply::raw(StatusCode::SERVICE_UNAVAILABLE, "down"));

    let err = practicum_client(&base, Duration::from_secs(5))
        .fetch(0)
        .await
        .expect_err("fetch should fail");

    assert!(
        matches!(err, RelayError::HttpStatus { status: 503, .. }),
        "Expected HttpStatus 503, got: {err:?}"
    );
}

#[tokio::test]
async fn test_fetch_invalid_json_is_parse_error() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.push_reply(ApiReply::raw(StatusCode::OK, "<html>not json</html>"));

    let err = practicum_client(&base, Duration::from_secs(5))
        .fetch(0)
        .await
        .expect_err("fetch should fail");

    assert!(matches!(err, RelayError::Parse { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_fetch_timeout_is_network_error() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.push_reply(ApiReply {
        delay: Duration::from_secs(3),
        ..ApiReply::json(&homework_answer("hw", "approved", 1))
    });

    let err = practicum_client(&base, Duration::from_millis(200))
        .fetch(0)
        .await
        .expect_err("fetch should time out");

    assert!(matches!(err, RelayError::Network { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    // Grab a free port, then release it so nothing listens there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);

    let err = practicum_client(&format!("http://{addr}"), Duration::from_secs(2))
        .fetch(0)
        .await
        .expect_err("fetch should fail");

    assert!(matches!(err, RelayError::Network { .. }), "got: {err:?}");
}

// ============================================================================
// Telegram notifier
// ============================================================================

#[tokio::test]
async fn test_notifier_posts_to_bot_chat() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;

    telegram_notifier(&base)
        .send_message("hello")
        .await
        .expect("send failed");

    let sent = mock.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].bot_segment, format!("bot{TELEGRAM_TOKEN}"));
    assert_eq!(sent[0].chat_id, CHAT_ID);
    assert_eq!(sent[0].text, "hello");
}

#[tokio::test]
async fn test_notifier_bot_api_error_is_delivery_error() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.fail_bot(
        StatusCode::BAD_REQUEST,
        json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
    );

    let err = telegram_notifier(&base)
        .send_message("hello")
        .await
        .expect_err("send should fail");

    assert!(err.is_delivery());
    assert!(err.to_string().contains("chat not found"), "got: {err}");
    assert!(!err.to_string().contains("telegram-secret"));
}

// ============================================================================
// Full cycles
// ============================================================================

#[tokio::test]
async fn test_status_change_is_relayed_once_and_cursor_advances() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.push_reply(ApiReply::json(&homework_answer("hw05_final", "reviewing", 2000)));
    mock.push_reply(ApiReply::json(&homework_answer("hw05_final", "reviewing", 3000)));
    mock.push_reply(ApiReply::json(&homework_answer("hw05_final", "approved", 4000)));

    let mut poller = Poller::new(
        practicum_client(&base, Duration::from_secs(5)),
        telegram_notifier(&base),
        PollState::new(1000),
        Duration::from_secs(600),
    );

    assert!(matches!(poller.run_cycle().await, CycleOutcome::Notified(_)));
    assert_eq!(poller.run_cycle().await, CycleOutcome::Unchanged);
    assert!(matches!(poller.run_cycle().await, CycleOutcome::Notified(_)));

    let sent = mock.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].text,
        "Изменился статус проверки работы \"hw05_final\". Работа взята на проверку ревьюером."
    );
    assert!(sent[1].text.ends_with("Ура!"));

    // The duplicate cycle must not have moved the cursor.
    let cursors: Vec<_> = mock
        .api_requests()
        .into_iter()
        .map(|r| r.from_date.unwrap_or_default())
        .collect();
    assert_eq!(cursors, vec!["1000", "2000", "2000"]);
    assert_eq!(poller.state().cursor, 4000);
}

#[tokio::test]
async fn test_repeated_api_failure_is_reported_once() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    for _ in 0..3 {
        mock.push_reply(ApiReply::raw(StatusCode::INTERNAL_SERVER_ERROR, "oops"));
    }
    mock.push_reply(ApiReply::json(&json!({"homeworks": "nope", "current_date": 1})));

    let mut poller = Poller::new(
        practicum_client(&base, Duration::from_secs(5)),
        telegram_notifier(&base),
        PollState::new(1000),
        Duration::from_secs(600),
    );

    for _ in 0..4 {
        poller.run_cycle().await;
    }

    let sent = mock.sent();
    assert_eq!(sent.len(), 2, "got: {sent:?}");
    assert!(sent[0].text.starts_with("Сбой в работе программы: "));
    assert!(sent[0].text.contains("HTTP 500"));
    assert!(sent[1].text.contains("'homeworks' is not a list"));
    assert_eq!(poller.state().phase, PollPhase::Backoff);
    assert_eq!(poller.state().cursor, 1000);
}

#[tokio::test]
async fn test_unreachable_chat_does_not_advance_cursor() {
    let mock = Mock::default();
    let base = spawn_mock(mock.clone()).await;
    mock.push_reply(ApiReply::json(&homework_answer("hw", "rejected", 2000)));
    mock.fail_bot(
        StatusCode::FORBIDDEN,
        json!({"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}),
    );

    let mut poller = Poller::new(
        practicum_client(&base, Duration::from_secs(5)),
        telegram_notifier(&base),
        PollState::new(1000),
        Duration::from_secs(600),
    );

    assert_eq!(poller.run_cycle().await, CycleOutcome::DeliveryFailed);
    assert_eq!(poller.state().cursor, 1000);
    assert!(poller.state().last_message.is_empty());
    assert!(mock.sent().is_empty());
}
