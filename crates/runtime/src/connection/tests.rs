use std::time::Duration;

use serde_json::json;
use skytravel_protocol::{SEARCH_STATUS, START_SEARCH};
use tokio::time::timeout;

use super::*;
use crate::transport::memory::{MemoryConnector, MemoryPeer, MemoryServer};

const WAIT: Duration = Duration::from_secs(5);

fn memory_manager() -> (ConnectionManager, MemoryServer) {
	let (connector, server) = MemoryConnector::new();
	let manager = ConnectionManager::without_connectors().with_connector(TransportKind::DirectStream, connector);
	(manager, server)
}

fn fast_config() -> ConnectionConfig {
	ConnectionConfig {
		reconnect_delay_ms: 10,
		..ConnectionConfig::default()
	}
}

async fn wait_for(handle: &ConnectionHandle, wanted: impl Fn(&ConnectionState) -> bool) -> ConnectionState {
	let mut rx = handle.watch_state();
	timeout(WAIT, async {
		loop {
			let current = rx.borrow_and_update().clone();
			if wanted(&current) {
				return current;
			}
			if rx.changed().await.is_err() {
				return handle.state();
			}
		}
	})
	.await
	.expect("state not reached in time")
}

async fn accept(server: &mut MemoryServer) -> MemoryPeer {
	timeout(WAIT, server.accept())
		.await
		.expect("no connection in time")
		.expect("connector dropped")
}

async fn connected(manager: &ConnectionManager, server: &mut MemoryServer) -> MemoryPeer {
	let peer = accept(server).await;
	wait_for(manager, ConnectionState::is_connected).await;
	peer
}

/// Collects state transitions through a channel so ordering is observable.
fn record_states(handle: &ConnectionHandle) -> (Subscription, mpsc::UnboundedReceiver<ConnectionState>) {
	let (tx, rx) = mpsc::unbounded_channel();
	let sub = handle.on_state_change(move |state| {
		let _ = tx.send(state.clone());
	});
	(sub, rx)
}

async fn next_state(rx: &mut mpsc::UnboundedReceiver<ConnectionState>) -> ConnectionState {
	timeout(WAIT, rx.recv())
		.await
		.expect("no state change in time")
		.expect("state channel closed")
}

#[tokio::test]
async fn test_emit_reaches_server() {
	let (manager, mut server) = memory_manager();
	manager.open(fast_config());
	let mut peer = connected(&manager, &mut server).await;

	assert!(manager.emit(START_SEARCH, json!({"origin": "JFK"})));

	let frame = timeout(WAIT, peer.recv()).await.unwrap().unwrap();
	assert_eq!(frame.event, START_SEARCH);
	assert_eq!(frame.data["origin"], "JFK");
}

#[tokio::test]
async fn test_emit_while_disconnected_is_dropped() {
	let (manager, _server) = memory_manager();

	assert_eq!(manager.state(), ConnectionState::Disconnected);
	assert!(!manager.emit(START_SEARCH, json!({})));
}

#[tokio::test]
async fn test_open_moves_to_connecting_immediately() {
	let (manager, _server) = memory_manager();
	let (_sub, mut states) = record_states(&manager);

	manager.open(fast_config());

	assert_eq!(next_state(&mut states).await, ConnectionState::Connecting);
	assert_eq!(next_state(&mut states).await, ConnectionState::Connected);
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
	let (manager, mut server) = memory_manager();
	let (tx, mut rx) = mpsc::unbounded_channel();

	let first = {
		let tx = tx.clone();
		manager.subscribe(SEARCH_STATUS, move |frame| {
			let _ = tx.send(("first", frame.data["message"].clone()));
		})
	};
	let second = manager.subscribe(SEARCH_STATUS, move |frame| {
		let _ = tx.send(("second", frame.data["message"].clone()));
	});
	assert_eq!(manager.handler_count(SEARCH_STATUS), 2);

	manager.open(fast_config());
	let peer = connected(&manager, &mut server).await;
	peer.push(SEARCH_STATUS, json!({"message": "Searching"}));

	let a = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
	let b = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
	assert_eq!(a, ("first", json!("Searching")));
	assert_eq!(b, ("second", json!("Searching")));

	drop(first);
	drop(second);
}

#[tokio::test]
async fn test_unsubscribe_by_name_removes_all_handlers() {
	let (manager, mut server) = memory_manager();
	let (tx, mut rx) = mpsc::unbounded_channel();

	let _a = {
		let tx = tx.clone();
		manager.subscribe(SEARCH_STATUS, move |_| {
			let _ = tx.send("status");
		})
	};
	let _b = {
		let tx = tx.clone();
		manager.subscribe(SEARCH_STATUS, move |_| {
			let _ = tx.send("status");
		})
	};
	let _marker = manager.subscribe("marker", move |_| {
		let _ = tx.send("marker");
	});

	assert_eq!(manager.unsubscribe(SEARCH_STATUS), 2);
	assert_eq!(manager.handler_count(SEARCH_STATUS), 0);
	assert_eq!(manager.unsubscribe(SEARCH_STATUS), 0);

	manager.open(fast_config());
	let peer = connected(&manager, &mut server).await;
	peer.push(SEARCH_STATUS, json!({"message": "ignored"}));
	peer.push("marker", json!(null));

	// The marker is dispatched after the status frame, so nothing else may precede it.
	assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some("marker"));
}

#[tokio::test]
async fn test_dropping_subscription_removes_handler() {
	let (manager, _server) = memory_manager();

	let sub = manager.subscribe(SEARCH_STATUS, |_| {});
	assert_eq!(manager.handler_count(SEARCH_STATUS), 1);

	drop(sub);
	assert_eq!(manager.handler_count(SEARCH_STATUS), 0);
}

#[tokio::test]
async fn test_inbound_frames_keep_arrival_order() {
	let (manager, mut server) = memory_manager();
	let (tx, mut rx) = mpsc::unbounded_channel();
	let _sub = manager.subscribe(SEARCH_STATUS, move |frame| {
		let _ = tx.send(frame.data["n"].as_u64());
	});

	manager.open(fast_config());
	let peer = connected(&manager, &mut server).await;
	for n in 0..20u64 {
		peer.push(SEARCH_STATUS, json!({ "n": n }));
	}

	let mut seen = Vec::new();
	for _ in 0..20 {
		seen.push(timeout(WAIT, rx.recv()).await.unwrap().unwrap().unwrap());
	}
	assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
	let (manager, mut server) = memory_manager();
	let (_sub, mut states) = record_states(&manager);

	manager.open(fast_config());
	let peer = connected(&manager, &mut server).await;
	drop(peer);

	let _peer = connected(&manager, &mut server).await;
	assert_eq!(server.attempts(), 2);

	let expected = [
		ConnectionState::Connecting,
		ConnectionState::Connected,
		ConnectionState::Disconnected,
		ConnectionState::Connecting,
		ConnectionState::Connected,
	];
	for state in expected {
		assert_eq!(next_state(&mut states).await, state);
	}
}

#[tokio::test]
async fn test_transport_error_is_reported_then_recovered() {
	let (manager, mut server) = memory_manager();
	let (_sub, mut states) = record_states(&manager);

	manager.open(fast_config());
	let peer = connected(&manager, &mut server).await;
	peer.fail("socket reset");

	let _peer = connected(&manager, &mut server).await;

	let mut saw_error = false;
	loop {
		match next_state(&mut states).await {
			ConnectionState::Error(message) => {
				assert!(message.contains("socket reset"), "unexpected message: {message}");
				saw_error = true;
			}
			ConnectionState::Connected if saw_error => break,
			_ => {}
		}
	}
	assert_eq!(manager.last_error(), None);
}

#[tokio::test]
async fn test_gives_up_after_reconnect_budget() {
	let (manager, server) = memory_manager();
	server.refuse_next(100);

	manager.open(ConnectionConfig {
		reconnect_delay_ms: 5,
		max_reconnect_attempts: 2,
		..ConnectionConfig::default()
	});

	wait_for(&manager, |s| *s == ConnectionState::Disconnected).await;
	assert_eq!(server.attempts(), 3);
	assert!(manager.last_error().unwrap().contains("connection refused"));
	assert!(!manager.emit(START_SEARCH, json!({})));
}

#[tokio::test]
async fn test_no_reconnect_when_disabled() {
	let (manager, mut server) = memory_manager();

	manager.open(ConnectionConfig {
		auto_reconnect: false,
		..fast_config()
	});
	let peer = connected(&manager, &mut server).await;
	drop(peer);

	wait_for(&manager, |s| *s == ConnectionState::Disconnected).await;
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(server.attempts(), 1);
	assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_close_is_idempotent() {
	let (manager, mut server) = memory_manager();
	manager.open(fast_config());
	let mut peer = connected(&manager, &mut server).await;

	manager.close();
	assert_eq!(manager.state(), ConnectionState::Disconnected);
	manager.close();
	assert_eq!(manager.state(), ConnectionState::Disconnected);

	assert!(timeout(WAIT, peer.recv()).await.unwrap().is_none());
	assert!(!manager.emit(START_SEARCH, json!({})));
}

#[tokio::test]
async fn test_drop_closes_channel() {
	let (manager, mut server) = memory_manager();
	let handle = manager.handle();
	manager.open(fast_config());
	let mut peer = connected(&manager, &mut server).await;

	drop(manager);

	assert!(timeout(WAIT, peer.recv()).await.unwrap().is_none());
	assert_eq!(handle.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connection_ack_records_server_sid() {
	let (manager, mut server) = memory_manager();
	let (tx, mut rx) = mpsc::unbounded_channel();
	let _sub = manager.subscribe(CONNECTION_ACK, move |_| {
		let _ = tx.send(());
	});

	manager.open(fast_config());
	let peer = connected(&manager, &mut server).await;
	assert_eq!(manager.server_sid(), None);

	peer.push(CONNECTION_ACK, json!({"message": "Connected to server", "sid": "abc123"}));
	timeout(WAIT, rx.recv()).await.unwrap().unwrap();

	assert_eq!(manager.server_sid().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_unsupported_transports_report_no_transport() {
	let (manager, server) = memory_manager();
	let (_sub, mut states) = record_states(&manager);

	manager.open(ConnectionConfig {
		transports: vec![TransportKind::FallbackPoll],
		..fast_config()
	});

	assert_eq!(next_state(&mut states).await, ConnectionState::Connecting);
	assert!(matches!(next_state(&mut states).await, ConnectionState::Error(ref m) if m.contains("No connector")));
	assert_eq!(next_state(&mut states).await, ConnectionState::Disconnected);
	assert!(manager.last_error().unwrap().contains("No connector"));
	assert_eq!(server.attempts(), 0);
}

#[tokio::test]
async fn test_fallback_listed_first_is_skipped() {
	let (manager, mut server) = memory_manager();

	manager.open(ConnectionConfig {
		transports: vec![TransportKind::FallbackPoll, TransportKind::DirectStream],
		..fast_config()
	});

	let _peer = connected(&manager, &mut server).await;
	assert_eq!(server.attempts(), 1);
}

#[tokio::test]
async fn test_invalid_endpoint_sets_error() {
	let (manager, server) = memory_manager();

	manager.open(ConnectionConfig::new("ftp://example.com"));

	wait_for(&manager, |s| *s == ConnectionState::Disconnected).await;
	assert!(manager.last_error().unwrap().contains("Invalid endpoint"));
	assert_eq!(server.attempts(), 0);
}

#[tokio::test]
async fn test_reopen_replaces_channel() {
	let (manager, mut server) = memory_manager();
	manager.open(fast_config());
	let mut first = connected(&manager, &mut server).await;

	manager.open(fast_config());
	let mut second = connected(&manager, &mut server).await;

	assert!(timeout(WAIT, first.recv()).await.unwrap().is_none());
	assert!(manager.emit(START_SEARCH, json!({})));
	assert_eq!(timeout(WAIT, second.recv()).await.unwrap().unwrap().event, START_SEARCH);
}
