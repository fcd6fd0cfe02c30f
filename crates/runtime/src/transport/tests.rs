use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use serde_json::json;
use skytravel_protocol::{CONNECTION_ACK, SEARCH_COMPLETE, START_SEARCH};
use tokio::time::timeout;

use super::memory::MemoryConnector;
use super::websocket::WebSocketConnector;
use super::*;
use crate::{ConnectionConfig, ConnectionManager, ConnectionState};

const WAIT: Duration = Duration::from_secs(5);

/// Greets with a malformed message and an ack, then answers every
/// `start-search` with a `search-complete` carrying the same session.
async fn search_backend(mut socket: WebSocket) {
	let _ = socket.send(Message::Text("not a frame".into())).await;
	let ack = json!({"event": CONNECTION_ACK, "data": {"message": "Connected to server", "sid": "sid-1"}});
	let _ = socket.send(Message::Text(ack.to_string().into())).await;

	while let Some(Ok(message)) = socket.recv().await {
		let Message::Text(text) = message else {
			continue;
		};
		let Ok(frame) = serde_json::from_str::<Frame>(text.as_str()) else {
			continue;
		};
		if frame.event != START_SEARCH {
			continue;
		}
		let reply = Frame::new(
			SEARCH_COMPLETE,
			json!({"status": "completed", "data": {"recommendations": [], "total_flights_analyzed": 0}}),
		)
		.with_session(frame.session);
		let body = serde_json::to_string(&reply).unwrap();
		if socket.send(Message::Text(body.into())).await.is_err() {
			break;
		}
	}
}

async fn spawn_backend() -> SocketAddr {
	let app = Router::new().route("/ws", get(|ws: WebSocketUpgrade| async move { ws.on_upgrade(search_backend) }));
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	addr
}

#[tokio::test]
async fn test_websocket_round_trip() {
	let addr = spawn_backend().await;
	let endpoint = Url::parse(&format!("ws://{addr}/ws")).unwrap();

	let TransportParts {
		mut sender,
		mut receiver,
	} = WebSocketConnector::new().connect(&endpoint).await.unwrap();

	// The malformed greeting is skipped, the ack comes through.
	let ack = timeout(WAIT, receiver.recv()).await.unwrap().unwrap().unwrap();
	assert_eq!(ack.event, CONNECTION_ACK);
	assert_eq!(ack.data["sid"], "sid-1");

	let request = Frame::new(START_SEARCH, json!({"origin": "JFK"})).with_session(Some(3));
	sender.send(request).await.unwrap();

	let reply = timeout(WAIT, receiver.recv()).await.unwrap().unwrap().unwrap();
	assert_eq!(reply.event, SEARCH_COMPLETE);
	assert_eq!(reply.session, Some(3));

	sender.close().await;
}

#[tokio::test]
async fn test_websocket_connect_refused() {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let endpoint = Url::parse(&format!("ws://{addr}/ws")).unwrap();
	let result = WebSocketConnector::new()
		.with_connect_timeout(Duration::from_secs(2))
		.connect(&endpoint)
		.await;

	let err = result.err().unwrap();
	assert!(err.is_retryable(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_manager_over_websocket() {
	let addr = spawn_backend().await;
	let manager = ConnectionManager::new();
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	let _sub = manager.subscribe(SEARCH_COMPLETE, move |frame| {
		let _ = tx.send(frame.clone());
	});

	// Bare http origin maps to ws://.../ws
	manager.open(ConnectionConfig::new(format!("http://{addr}")));

	let mut state = manager.watch_state();
	timeout(WAIT, state.wait_for(ConnectionState::is_connected))
		.await
		.unwrap()
		.unwrap();

	assert!(manager.send(Frame::new(START_SEARCH, json!({})).with_session(Some(9))));
	let reply = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
	assert_eq!(reply.session, Some(9));
	assert_eq!(manager.server_sid().as_deref(), Some("sid-1"));
}

#[tokio::test]
async fn test_memory_refusal_counts_attempts() {
	let (connector, server) = MemoryConnector::new();
	let endpoint = Url::parse("ws://localhost/ws").unwrap();
	server.refuse_next(1);

	assert!(connector.connect(&endpoint).await.is_err());
	assert!(connector.connect(&endpoint).await.is_ok());
	assert_eq!(server.attempts(), 2);
}
