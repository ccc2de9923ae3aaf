//! Integration tests for WebSocket auth, lobby membership, and lobby chat.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;
type WsWrite = futures_util::stream::SplitSink<WsStream, Message>;
type WsRead = futures_util::stream::SplitStream<WsStream>;

/// Helper: start the server on a random port and return
/// (base_url, addr, db) — the pool is shared with the server so tests can
/// check persisted rows directly.
async fn start_test_server() -> (String, SocketAddr, dropfour_server::db::DbPool) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = dropfour_server::db::init_db(&data_dir).expect("Failed to init DB");
    let state = dropfour_server::state::AppState::new(db.clone());
    let app = dropfour_server::routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    let base_url = format!("http://{}", addr);
    (base_url, addr, db)
}

/// Create an account and log in; returns (user_id, session_id).
async fn create_and_login(base_url: &str, username: &str) -> (i64, i64) {
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/createAccount", base_url))
        .json(&json!({
            "username": username,
            "password": "secret-pw",
            "confirmPassword": "secret-pw",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "createAccount failed for {}", username);

    let resp = client
        .post(format!("{}/login", base_url))
        .json(&json!({ "username": username, "password": "secret-pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "login failed for {}", username);
    let body: serde_json::Value = resp.json().await.unwrap();
    (
        body["message"]["userId"].as_i64().unwrap(),
        body["message"]["sessionId"].as_i64().unwrap(),
    )
}

/// Open an authenticated WebSocket connection.
async fn connect_ws(addr: &SocketAddr, user_id: i64, session_id: i64) -> (WsWrite, WsRead) {
    let ws_url = format!(
        "ws://{}/ws?user_id={}&session_id={}",
        addr, user_id, session_id
    );
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream.split()
}

async fn send_event(write: &mut WsWrite, event: serde_json::Value) {
    write
        .send(Message::Text(event.to_string().into()))
        .await
        .expect("Failed to send event");
}

/// Read the next JSON event, skipping transport frames.
async fn recv_event(read: &mut WsRead) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
            .await
            .expect("Timed out waiting for event")
            .expect("WebSocket stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Event was not valid JSON");
        }
    }
}

#[tokio::test]
async fn test_ws_rejects_bad_session() {
    let (base_url, addr, _db) = start_test_server().await;
    let (user_id, session_id) = create_and_login(&base_url, "mallory").await;

    // Wrong session id: the upgrade succeeds, then the server closes with
    // its session close code.
    let ws_url = format!(
        "ws://{}/ws?user_id={}&session_id={}",
        addr,
        user_id,
        session_id + 999
    );
    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("WebSocket should upgrade even with a bad session");
    let (_write, mut read) = ws_stream.split();

    let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Expected close within timeout");

    match msg {
        Some(Ok(Message::Close(Some(frame)))) => {
            let code: u16 = frame.code.into();
            assert!(
                code == 4001 || code == 4002,
                "Expected session close code, got {}",
                code
            );
        }
        Some(Ok(Message::Close(None))) | None => {}
        other => panic!("Expected close message, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_lobby_chat_broadcasts_to_everyone_including_sender() {
    let (base_url, addr, _db) = start_test_server().await;
    let (alice_id, alice_session) = create_and_login(&base_url, "alice").await;
    let (bob_id, bob_session) = create_and_login(&base_url, "bob").await;

    let (mut alice_write, mut alice_read) = connect_ws(&addr, alice_id, alice_session).await;
    let (_bob_write, mut bob_read) = connect_ws(&addr, bob_id, bob_session).await;

    // Give both actors a moment to join the lobby
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_event(
        &mut alice_write,
        json!({ "action": "lobbyChat", "text": "alice: hello lobby" }),
    )
    .await;

    // Everyone in the lobby gets the message, the sender included —
    // clients render from the broadcast, not the local send.
    for read in [&mut alice_read, &mut bob_read] {
        let event = recv_event(read).await;
        assert_eq!(event["action"], "lobbyChat");
        assert_eq!(event["senderId"], alice_id);
        assert_eq!(event["text"], "alice: hello lobby");
    }
}

#[tokio::test]
async fn test_lobby_message_is_persisted_before_broadcast() {
    let (base_url, addr, db) = start_test_server().await;
    let (alice_id, alice_session) = create_and_login(&base_url, "alice").await;

    let (mut write, mut read) = connect_ws(&addr, alice_id, alice_session).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_event(
        &mut write,
        json!({ "action": "lobbyChat", "text": "for the record" }),
    )
    .await;
    let event = recv_event(&mut read).await;
    assert_eq!(event["action"], "lobbyChat");

    // Receiving the broadcast means the row must already be in the log.
    let (sender_id, message): (i64, String) = {
        let conn = db.lock().unwrap();
        conn.query_row(
            "SELECT sender_id, message FROM lobby_messages",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("Lobby message should be persisted")
    };
    assert_eq!(sender_id, alice_id);
    assert_eq!(message, "for the record");
}

#[tokio::test]
async fn test_register_for_another_user_is_rejected() {
    let (base_url, addr, _db) = start_test_server().await;
    let (alice_id, alice_session) = create_and_login(&base_url, "alice").await;

    let (mut write, mut read) = connect_ws(&addr, alice_id, alice_session).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    send_event(
        &mut write,
        json!({ "action": "register", "userId": alice_id + 1 }),
    )
    .await;

    let event = recv_event(&mut read).await;
    assert_eq!(event["action"], "error");
    assert_eq!(event["reason"], "Cannot register as another user");
}
