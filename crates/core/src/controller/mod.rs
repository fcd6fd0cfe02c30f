//! Search session controller.
//!
//! The controller subscribes to `search-status`, `search-complete` and
//! `search-error` when it is built and to connection state changes; all four
//! subscriptions are released when it is dropped.
//!
//! Every outbound `start-search` frame carries a fresh [`SessionToken`].
//! Inbound frames that name a different token, or arrive when no search is
//! active, are discarded. Frames without a token belong to the active search.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use parking_lot::Mutex;
use skytravel_protocol::{
	CalendarDate, ClientEvent, CompletePayload, ErrorPayload, Frame, SEARCH_COMPLETE, SEARCH_ERROR, SEARCH_STATUS,
	SearchRequest, ServerEvent, SessionToken, StatusPayload,
};
use skytravel_runtime::{ConnectionHandle, ConnectionState, Subscription};
use tokio::sync::{broadcast, watch};

use crate::error::{Result, SubmitError};
use crate::session::{
	CONNECTION_LOST_MESSAGE, FailureKind, NO_CONNECTION_MESSAGE, STARTING_MESSAGE, SUBMITTING_MESSAGE, SearchSession,
	SessionPhase, SessionState,
};


/// Source of "today" for past-date validation.
pub type Clock = Arc<dyn Fn() -> CalendarDate + Send + Sync>;

const TRANSITION_CAPACITY: usize = 64;

struct Shared {
	session: Mutex<SearchSession>,
	snapshot: watch::Sender<SearchSession>,
	transitions: broadcast::Sender<SessionPhase>,
	next_token: AtomicU64,
}

impl Shared {
	/// Replaces the session and publishes it. Must be called with `current` locked.
	fn commit(&self, current: &mut SearchSession, next: SearchSession) {
		let from = current.phase();
		let to = next.phase();
		*current = next;

		if from != to {
			tracing::debug!(%from, %to, token = ?current.token(), "Search phase changed");
			let _ = self.transitions.send(to);
		}
		self.snapshot.send_replace(current.clone());
	}

	/// Whether `frame` answers the active search.
	fn accepts(&self, session: &SearchSession, frame: &Frame) -> bool {
		if !session.is_active() {
			tracing::debug!(event = %frame.event, phase = %session.phase(), "Ignoring event: no active search");
			return false;
		}
		match frame.session {
			Some(token) if Some(token) != session.token() => {
				tracing::warn!(
					event = %frame.event,
					token,
					active = ?session.token(),
					"Discarding event for a superseded search"
				);
				false
			}
			_ => true,
		}
	}

	/// Applies one inbound search event to the active session.
	fn on_event(&self, frame: &Frame) {
		let decoded = ServerEvent::from_frame(frame);

		let mut session = self.session.lock();
		if !self.accepts(&session, frame) {
			return;
		}

		let next = match decoded {
			Ok(Some(ServerEvent::Status(StatusPayload { status, message }))) => {
				tracing::info!(stage = ?status, %message, "Search progress");
				SessionState::InProgress {
					status_message: message,
					stage: status,
				}
			}
			Ok(Some(ServerEvent::Complete(CompletePayload { data, search_params }))) => {
				if let (Some(echoed), Some(active)) = (&search_params, session.request()) {
					if !echoed.same_search(active) {
						tracing::warn!(?echoed, ?active, "Discarding result for different search criteria");
						return;
					}
				}
				tracing::info!(
					recommendations = data.recommendations.len(),
					analyzed = data.total_analyzed,
					"Search completed"
				);
				SessionState::Completed { result: data }
			}
			Ok(Some(ServerEvent::Error(ErrorPayload { error, message }))) => {
				tracing::warn!(kind = ?error, %message, "Search failed on the backend");
				SessionState::Failed {
					kind: FailureKind::Backend,
					error_kind: error,
					error_message: message,
				}
			}
			Ok(_) => return,
			Err(e) => {
				tracing::error!(event = %frame.event, error = %e, "Malformed event payload");
				let what = match frame.event.as_str() {
					SEARCH_COMPLETE => "search result",
					SEARCH_ERROR => "search error",
					// Bad progress updates are dropped.
					_ => return,
				};
				SessionState::failed(FailureKind::Protocol, format!("Malformed {what}: {e}"))
			}
		};
		let next = session.with_state(next);
		self.commit(&mut session, next);
	}

	fn on_connection_state(&self, state: &ConnectionState) {
		if state.is_connected() {
			return;
		}

		let mut session = self.session.lock();
		if !session.is_active() {
			return;
		}
		tracing::warn!(%state, token = ?session.token(), "Connection lost during search");
		let next = session.with_state(SessionState::failed(FailureKind::Connection, CONNECTION_LOST_MESSAGE));
		self.commit(&mut session, next);
	}
}

/// Drives one search at a time over a shared connection.
///
/// The rendering side reads [`session`](Self::session) (or awaits
/// [`watch`](Self::watch)) and calls [`submit`](Self::submit) /
/// [`reset`](Self::reset); it never touches the channel.
pub struct SearchController {
	connection: ConnectionHandle,
	shared: Arc<Shared>,
	clock: Clock,
	_subscriptions: Vec<Subscription>,
}

impl SearchController {
	/// Creates an idle controller bound to `connection`, validating dates
	/// against the local calendar.
	pub fn new(connection: ConnectionHandle) -> Self {
		Self::with_clock(connection, Arc::new(|| Local::now().date_naive()))
	}

	/// Like [`new`](Self::new) with an explicit source of "today".
	pub fn with_clock(connection: ConnectionHandle, clock: Clock) -> Self {
		let (snapshot, _) = watch::channel(SearchSession::idle());
		let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
		let shared = Arc::new(Shared {
			session: Mutex::new(SearchSession::idle()),
			snapshot,
			transitions,
			next_token: AtomicU64::new(1),
		});

		let mut subscriptions: Vec<Subscription> = [SEARCH_STATUS, SEARCH_COMPLETE, SEARCH_ERROR]
			.into_iter()
			.map(|event| {
				let shared = Arc::clone(&shared);
				connection.subscribe(event, move |frame| shared.on_event(frame))
			})
			.collect();
		subscriptions.push({
			let shared = Arc::clone(&shared);
			connection.on_state_change(move |state| shared.on_connection_state(state))
		});

		Self {
			connection,
			shared,
			clock,
			_subscriptions: subscriptions,
		}
	}

	/// Starts a new search, replacing whatever the previous session held.
	///
	/// Returns once the `start-search` frame is handed to the connection;
	/// progress and the outcome arrive later through the session. On error the
	/// session is already `failed` and no frame was sent.
	///
	/// # Errors
	///
	/// - [`SubmitError::Invalid`] if a required field is empty, the date does
	///   not parse or lies in the past
	/// - [`SubmitError::NotConnected`] if the channel is not connected
	pub fn submit(&self, request: SearchRequest) -> Result<SessionToken> {
		let today = (self.clock)();
		let mut session = self.shared.session.lock();

		if let Err(e) = request.validate(today) {
			tracing::warn!(error = %e, "Rejected search request");
			let failed = SearchSession::new(None, request, SessionState::failed(FailureKind::Validation, e.to_string()));
			self.shared.commit(&mut session, failed);
			return Err(e.into());
		}

		let connection = self.connection.state();
		if !connection.is_connected() {
			tracing::warn!(state = %connection, "Cannot search without a connection");
			let failed = SearchSession::new(
				None,
				request,
				SessionState::failed(FailureKind::Connection, NO_CONNECTION_MESSAGE),
			);
			self.shared.commit(&mut session, failed);
			return Err(SubmitError::NotConnected(connection));
		}

		let token = self.shared.next_token.fetch_add(1, Ordering::SeqCst);
		let submitting = SearchSession::new(
			Some(token),
			request.clone(),
			SessionState::Submitting {
				status_message: SUBMITTING_MESSAGE.to_string(),
			},
		);
		self.shared.commit(&mut session, submitting);

		let frame = match ClientEvent::StartSearch(request).into_frame() {
			Ok(frame) => frame.with_session(Some(token)),
			Err(e) => {
				let next = session.with_state(SessionState::failed(FailureKind::Protocol, e.to_string()));
				self.shared.commit(&mut session, next);
				return Err(e.into());
			}
		};

		if !self.connection.send(frame) {
			let next = session.with_state(SessionState::failed(FailureKind::Connection, NO_CONNECTION_MESSAGE));
			self.shared.commit(&mut session, next);
			return Err(SubmitError::Dropped);
		}

		tracing::info!(token, "Search submitted");
		let next = session.with_state(SessionState::InProgress {
			status_message: STARTING_MESSAGE.to_string(),
			stage: None,
		});
		self.shared.commit(&mut session, next);
		Ok(token)
	}

	/// Returns to `idle`, dropping any result, error or status. The
	/// connection is left alone, and events for the abandoned search are
	/// ignored from here on.
	pub fn reset(&self) {
		let mut session = self.shared.session.lock();
		if session.phase() != SessionPhase::Idle {
			tracing::debug!(token = ?session.token(), "Resetting search session");
		}
		self.shared.commit(&mut session, SearchSession::idle());
	}

	/// Current session snapshot.
	pub fn session(&self) -> SearchSession {
		self.shared.session.lock().clone()
	}

	pub fn phase(&self) -> SessionPhase {
		self.shared.session.lock().phase()
	}

	/// Receiver that always holds the latest session.
	pub fn watch(&self) -> watch::Receiver<SearchSession> {
		self.shared.snapshot.subscribe()
	}

	/// Every phase change from now on, in order.
	pub fn transitions(&self) -> broadcast::Receiver<SessionPhase> {
		self.shared.transitions.subscribe()
	}

	pub fn connection_state(&self) -> ConnectionState {
		self.connection.state()
	}

	/// Last connect or transport error reported by the connection.
	pub fn last_connection_error(&self) -> Option<String> {
		self.connection.last_error()
	}
}
