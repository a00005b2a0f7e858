use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use jira_chat_client::events::ChatEvent;
use jira_chat_client::session::Navigation;
use jira_chat_client::state::{HistoryEntry, InitialState};
use jira_chat_client::view::{ChatMessage, MessageRole, SUBMIT_FAILED};
use jira_chat_client::{ChatClient, ChatError, ChatSettings, StreamingChatClient, SubmitOutcome};

/// A request the mock server received.
#[derive(Debug, Clone)]
struct Received {
    path: String,
    csrf: Option<String>,
    form: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct MockState {
    received: Arc<Mutex<Vec<Received>>>,
}

impl MockState {
    fn record(&self, path: &str, headers: &HeaderMap, form: HashMap<String, String>) {
        self.received.lock().unwrap().push(Received {
            path: path.to_string(),
            csrf: headers
                .get("x-csrftoken")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            form,
        });
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

/// Body that sends each chunk separately with a short pause in between.
fn chunked_body(chunks: Vec<Vec<u8>>) -> Body {
    Body::from_stream(async_stream::stream! {
        for chunk in chunks {
            yield Ok::<_, std::io::Error>(chunk);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
}

/// Body that sends one chunk and then never finishes.
fn hanging_body() -> Body {
    Body::from_stream(async_stream::stream! {
        yield Ok::<_, std::io::Error>(b"Working on it".to_vec());
        futures::future::pending::<()>().await;
    })
}

async fn chat_page(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.record(&format!("/chat/{session_id}/"), &headers, form.clone());

    match session_id.as_str() {
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "hang" => hanging_body().into_response(),
        _ => {
            // "Tickets: ✅ created" with the check mark split across chunks.
            let text = "Tickets: ✅ created".as_bytes();
            let split = "Tickets: ".len() + 1;
            chunked_body(vec![
                text[..split].to_vec(),
                text[split..].to_vec(),
                format!(" for '{}'", form.get("user_input").cloned().unwrap_or_default())
                    .into_bytes(),
            ])
            .into_response()
        }
    }
}

async fn page_html() -> impl IntoResponse {
    (
        [("set-cookie", "csrftoken=cookie-token; Path=/")],
        axum::response::Html(
            r#"<form id="chat-form"><input type="hidden" name="csrfmiddlewaretoken" value="page-token"></form>"#,
        ),
    )
}

async fn list_sessions(State(state): State<MockState>, headers: HeaderMap) -> Json<serde_json::Value> {
    state.record("/api/chat-sessions/", &headers, HashMap::new());
    Json(json!({
        "sessions": [
            {"session_id": "s1", "title": "Login bugs", "message_count": 4,
             "last_activity": "2024-05-01T12:30:00+00:00"},
            {"session_id": "s2", "title": "", "message_count": 0,
             "last_activity": "2024-04-30T08:00:00+00:00"}
        ]
    }))
}

async fn new_chat(State(state): State<MockState>, headers: HeaderMap) -> Json<serde_json::Value> {
    state.record("/api/new-chat/", &headers, HashMap::new());
    Json(json!({"session_id": "fresh"}))
}

async fn rename_chat(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.record(&format!("/api/rename-chat/{session_id}/"), &headers, form.clone());
    Json(json!({"success": true, "title": form.get("title")}))
}

async fn delete_chat(
    State(state): State<MockState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    state.record(&format!("/api/delete-chat/{session_id}/"), &headers, HashMap::new());
    Json(json!({"success": session_id != "locked"}))
}

async fn spawn_server() -> (String, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/chat/{session_id}/", post(chat_page).get(page_html))
        .route("/api/chat-sessions/", get(list_sessions))
        .route("/api/new-chat/", post(new_chat))
        .route("/api/rename-chat/{session_id}/", post(rename_chat))
        .route("/api/delete-chat/{session_id}/", post(delete_chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn chat_for(base_url: &str, session: &str) -> StreamingChatClient {
    let client = ChatClient::new(base_url).unwrap().with_csrf_token("test-token");
    StreamingChatClient::new(
        client,
        InitialState::for_session(Some(session.to_string())),
        ChatSettings {
            auto_assign: true,
            idle_timeout: Some(Duration::from_secs(5)),
        },
    )
}

#[tokio::test]
async fn test_submit_streams_reply() {
    let (base_url, server) = spawn_server().await;
    let chat = chat_for(&base_url, "s1");
    let mut events = Vec::new();

    let outcome = chat
        .submit_with("  create a bug  ", |e| events.push(e.clone()))
        .await
        .unwrap();

    let expected = "Tickets: ✅ created for 'create a bug'";
    match outcome {
        SubmitOutcome::Completed { reply } => assert_eq!(reply, expected),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let view = chat.view();
    assert_eq!(
        view.messages(),
        &[ChatMessage::user("create a bug"), ChatMessage::bot(expected)]
    );
    assert!(view.pending().is_none());
    assert!(view.input().enabled);

    // Fragments concatenate to the reply and none carries a broken character.
    let fragments: String = events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Fragment { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(fragments, expected);
    assert!(!fragments.contains('\u{FFFD}'));
    assert!(matches!(events.first(), Some(ChatEvent::SubmitStarted { .. })));
    assert_eq!(events.last(), Some(&ChatEvent::InputUnlocked));

    let received = server.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/chat/s1/");
    assert_eq!(received[0].csrf.as_deref(), Some("test-token"));
    assert_eq!(received[0].form["user_input"], "create a bug");
    assert_eq!(received[0].form["auto_assign"], "true");
}

#[tokio::test]
async fn test_whitespace_submit_sends_nothing() {
    let (base_url, server) = spawn_server().await;
    let chat = chat_for(&base_url, "s1");

    let outcome = chat.submit("   ").await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Ignored));
    assert!(chat.view().messages().is_empty());
    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_failed_submit_renders_one_error_and_unlocks() {
    let (base_url, _server) = spawn_server().await;
    let chat = chat_for(&base_url, "broken");

    let outcome = chat.submit("hello").await.unwrap();

    match outcome {
        SubmitOutcome::Failed {
            error: ChatError::Http { status },
        } => assert_eq!(status, 500),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let view = chat.view();
    assert!(view.input().enabled);
    assert_eq!(view.error_count(), 1);
    assert_eq!(
        view.messages(),
        &[ChatMessage::user("hello"), ChatMessage::error(SUBMIT_FAILED)]
    );
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_network_error_is_surfaced() {
    // Bind then drop a listener so the port is closed.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let chat = chat_for(&format!("http://{addr}"), "s1");

    let outcome = chat.submit("hello").await.unwrap();

    assert!(matches!(
        outcome,
        SubmitOutcome::Failed {
            error: ChatError::Network(_)
        }
    ));
    assert_eq!(chat.view().error_count(), 1);
    assert!(chat.view().input().enabled);
}

#[tokio::test]
async fn test_cancel_hung_stream_keeps_partial_reply() {
    let (base_url, _server) = spawn_server().await;
    let chat = chat_for(&base_url, "hang");

    let canceller = chat.clone();
    let outcome = chat
        .submit_with("status?", move |event| {
            if matches!(event, ChatEvent::Fragment { .. }) {
                canceller.cancel();
            }
        })
        .await
        .unwrap();

    match outcome {
        SubmitOutcome::Cancelled { partial } => assert_eq!(partial, "Working on it"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let view = chat.view();
    assert!(view.input().enabled);
    assert_eq!(view.error_count(), 0);
    assert_eq!(view.messages()[1], ChatMessage::bot("Working on it"));
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_idle_timeout_fails_hung_stream() {
    let (base_url, _server) = spawn_server().await;
    let client = ChatClient::new(&base_url).unwrap();
    let chat = StreamingChatClient::new(
        client,
        InitialState::for_session(Some("hang".into())),
        ChatSettings {
            auto_assign: false,
            idle_timeout: Some(Duration::from_millis(200)),
        },
    );

    let outcome = chat.submit("status?").await.unwrap();

    assert!(matches!(
        outcome,
        SubmitOutcome::Failed {
            error: ChatError::Timeout(_)
        }
    ));
    let view = chat.view();
    assert_eq!(view.error_count(), 1);
    assert!(view.messages().contains(&ChatMessage::bot("Working on it")));
    assert!(view.input().enabled);
}

#[tokio::test]
async fn test_second_submit_while_busy_is_rejected() {
    let (base_url, _server) = spawn_server().await;
    let chat = chat_for(&base_url, "hang");

    let first = chat.submit("one");
    let second = async {
        while !chat.view().messages().iter().any(|m| m.role == MessageRole::Bot)
            && chat.view().pending().is_none()
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let result = chat.submit("two").await;
        chat.cancel();
        result
    };

    let (first, second) = tokio::join!(first, second);

    assert!(matches!(second, Err(ChatError::Busy)));
    assert!(matches!(first.unwrap(), SubmitOutcome::Cancelled { .. }));
    let users: Vec<_> = chat
        .view()
        .messages()
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .cloned()
        .collect();
    assert_eq!(users, vec![ChatMessage::user("one")]);
}

#[tokio::test]
async fn test_session_list() {
    let (base_url, _server) = spawn_server().await;
    let chat = chat_for(&base_url, "s1");

    chat.load_sessions().await.unwrap();

    let sessions = chat.sessions();
    assert_eq!(sessions.entries().len(), 2);
    assert!(sessions.get("s1").unwrap().active);
    assert!(!sessions.get("s2").unwrap().active);
    assert_eq!(sessions.get("s2").unwrap().title, "New Chat");
    assert_eq!(sessions.get("s1").unwrap().last_activity, "5/1/2024");

    assert_eq!(chat.click_session("s1"), Navigation::Stay);
    assert_eq!(chat.click_session("s2"), Navigation::Session("s2".into()));

    let html = chat.render_sessions();
    assert!(html.contains(r#"list-group-item-action active" data-session-id="s1""#));
}

#[tokio::test]
async fn test_new_rename_delete() {
    let (base_url, server) = spawn_server().await;
    let chat = chat_for(&base_url, "s1");

    assert_eq!(
        chat.new_chat().await.unwrap(),
        Navigation::Session("fresh".into())
    );

    let stored = chat.rename_chat("  Sprint 12  ").await.unwrap();
    assert_eq!(stored, "Sprint 12");
    assert_eq!(chat.view().title(), "Sprint 12");
    // Rename reloads the sidebar.
    assert_eq!(chat.sessions().entries().len(), 2);

    assert_eq!(chat.delete_chat().await.unwrap(), Navigation::Home);

    let received = server.received();
    let paths: Vec<_> = received.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/new-chat/",
            "/api/rename-chat/s1/",
            "/api/chat-sessions/",
            "/api/delete-chat/s1/"
        ]
    );
    assert_eq!(received[1].form["title"], "Sprint 12");
    assert!(
        received
            .iter()
            .filter(|r| r.path != "/api/chat-sessions/")
            .all(|r| r.csrf.as_deref() == Some("test-token"))
    );
}

#[tokio::test]
async fn test_delete_refused() {
    let (base_url, _server) = spawn_server().await;
    let chat = chat_for(&base_url, "locked");

    assert!(matches!(chat.delete_chat().await, Err(ChatError::Rejected(_))));
}

#[tokio::test]
async fn test_discover_csrf_token_from_page() {
    let (base_url, _server) = spawn_server().await;
    let client = ChatClient::new(&base_url).unwrap();

    let token = client.discover_csrf_token("/chat/s1/").await.unwrap();
    assert_eq!(token.as_deref(), Some("page-token"));
}

#[tokio::test]
async fn test_history_then_submit() {
    let (base_url, _server) = spawn_server().await;
    let client = ChatClient::new(&base_url).unwrap();
    let initial = InitialState {
        current_session_id: Some("s1".into()),
        chat_history: vec![HistoryEntry {
            user_message: "<b>earlier</b>".into(),
            bot_response: "ok".into(),
        }],
        ..InitialState::default()
    };
    let chat = StreamingChatClient::new(client, initial, ChatSettings::default());

    chat.submit("<script>alert(1)</script>").await.unwrap();

    let view = chat.view();
    assert_eq!(view.messages().len(), 4);
    let html = chat.render_chat();
    assert!(html.contains("&lt;b&gt;earlier&lt;/b&gt;"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
}
