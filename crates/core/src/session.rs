//! The search session value exposed to renderers.

use std::fmt;

use serde::Serialize;
use skytravel_protocol::{RecommendationResult, SearchRequest, SessionToken};

/// Status text while the request is being handed to the connection.
pub const SUBMITTING_MESSAGE: &str = "Sending search request...";

/// Status text once the request is on its way and before the backend reports.
pub const STARTING_MESSAGE: &str = "Starting search...";

/// Failure message when submitting without a live connection.
pub const NO_CONNECTION_MESSAGE: &str = "No connection to the search service";

/// Failure message when the connection goes away mid-search.
pub const CONNECTION_LOST_MESSAGE: &str = "Connection to the search service was lost";

/// Coarse lifecycle of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
	Idle,
	Submitting,
	InProgress,
	Completed,
	Failed,
}

impl SessionPhase {
	/// Waiting on the backend.
	pub fn is_active(self) -> bool {
		matches!(self, SessionPhase::Submitting | SessionPhase::InProgress)
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, SessionPhase::Completed | SessionPhase::Failed)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			SessionPhase::Idle => "idle",
			SessionPhase::Submitting => "submitting",
			SessionPhase::InProgress => "inProgress",
			SessionPhase::Completed => "completed",
			SessionPhase::Failed => "failed",
		}
	}
}

impl fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Which part of the system a failed session is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
	/// Rejected before sending.
	Validation,
	/// Not connected at submit time, or lost mid-search.
	Connection,
	/// Reported by the backend through `search-error`.
	Backend,
	/// The backend answered with a payload that could not be decoded.
	Protocol,
}

/// Phase plus the data that only exists in that phase.
///
/// A status message only exists while submitting or in progress, a result
/// only when completed and an error message only when failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionState {
	Idle,
	Submitting {
		status_message: String,
	},
	InProgress {
		status_message: String,
		/// Backend stage such as `searching` or `analyzing`.
		#[serde(skip_serializing_if = "Option::is_none")]
		stage: Option<String>,
	},
	Completed {
		result: RecommendationResult,
	},
	Failed {
		kind: FailureKind,
		/// Short error title sent by the backend, if any.
		#[serde(skip_serializing_if = "Option::is_none")]
		error_kind: Option<String>,
		error_message: String,
	},
}

impl SessionState {
	pub fn phase(&self) -> SessionPhase {
		match self {
			SessionState::Idle => SessionPhase::Idle,
			SessionState::Submitting { .. } => SessionPhase::Submitting,
			SessionState::InProgress { .. } => SessionPhase::InProgress,
			SessionState::Completed { .. } => SessionPhase::Completed,
			SessionState::Failed { .. } => SessionPhase::Failed,
		}
	}

	pub(crate) fn failed(kind: FailureKind, error_message: impl Into<String>) -> Self {
		SessionState::Failed {
			kind,
			error_kind: None,
			error_message: error_message.into(),
		}
	}
}

/// Snapshot of the single search a controller tracks.
///
/// Starting a new search replaces the whole value; nothing carries over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
	#[serde(skip_serializing_if = "Option::is_none")]
	token: Option<SessionToken>,
	#[serde(skip_serializing_if = "Option::is_none")]
	request: Option<SearchRequest>,
	#[serde(flatten)]
	state: SessionState,
}

impl Default for SearchSession {
	fn default() -> Self {
		Self::idle()
	}
}

impl SearchSession {
	pub fn idle() -> Self {
		Self {
			token: None,
			request: None,
			state: SessionState::Idle,
		}
	}

	pub(crate) fn new(token: Option<SessionToken>, request: SearchRequest, state: SessionState) -> Self {
		Self {
			token,
			request: Some(request),
			state,
		}
	}

	/// Same search, next state.
	pub(crate) fn with_state(&self, state: SessionState) -> Self {
		Self {
			token: self.token,
			request: self.request.clone(),
			state,
		}
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	pub fn phase(&self) -> SessionPhase {
		self.state.phase()
	}

	pub fn is_active(&self) -> bool {
		self.phase().is_active()
	}

	/// Token of the search this session tracks. `None` when idle or when the
	/// request was rejected before a token was needed.
	pub fn token(&self) -> Option<SessionToken> {
		self.token
	}

	pub fn request(&self) -> Option<&SearchRequest> {
		self.request.as_ref()
	}

	/// Latest progress text; only set while submitting or in progress.
	pub fn status_message(&self) -> Option<&str> {
		match &self.state {
			SessionState::Submitting { status_message } | SessionState::InProgress { status_message, .. } => {
				Some(status_message)
			}
			_ => None,
		}
	}

	pub fn stage(&self) -> Option<&str> {
		match &self.state {
			SessionState::InProgress { stage, .. } => stage.as_deref(),
			_ => None,
		}
	}

	pub fn result(&self) -> Option<&RecommendationResult> {
		match &self.state {
			SessionState::Completed { result } => Some(result),
			_ => None,
		}
	}

	pub fn error_message(&self) -> Option<&str> {
		match &self.state {
			SessionState::Failed { error_message, .. } => Some(error_message),
			_ => None,
		}
	}

	pub fn error_kind(&self) -> Option<&str> {
		match &self.state {
			SessionState::Failed { error_kind, .. } => error_kind.as_deref(),
			_ => None,
		}
	}

	pub fn failure_kind(&self) -> Option<FailureKind> {
		match &self.state {
			SessionState::Failed { kind, .. } => Some(*kind),
			_ => None,
		}
	}
}
