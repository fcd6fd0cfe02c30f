//! Errors returned by [`SearchController::submit`](crate::SearchController::submit).

use skytravel_protocol::ValidationError;
use skytravel_runtime::ConnectionState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubmitError>;

/// Why a submission did not start a search.
///
/// Every variant is mirrored in the session, which moves to `failed`.
#[derive(Debug, Error)]
pub enum SubmitError {
	/// The request failed client-side validation; nothing was sent.
	#[error(transparent)]
	Invalid(#[from] ValidationError),

	/// The channel was not connected at submit time.
	#[error("No connection to the search service (connection is {0})")]
	NotConnected(ConnectionState),

	/// The request could not be encoded as a frame.
	#[error("Failed to encode search request: {0}")]
	Encode(#[from] serde_json::Error),

	/// The channel dropped the frame between the state check and the send.
	#[error("Search request was dropped by the connection")]
	Dropped,
}

impl SubmitError {
	/// Returns true if the caller's input was at fault.
	pub fn is_validation(&self) -> bool {
		matches!(self, SubmitError::Invalid(_))
	}
}
