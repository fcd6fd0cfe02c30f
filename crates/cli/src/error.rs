use std::path::PathBuf;

use skytravel::{FailureKind, SubmitError, ValidationError};
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Invalid(#[from] ValidationError),

	#[error("failed to read config file {path}: {source}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config file {path}: {source}")]
	ConfigFormat {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("could not connect to {url}: {reason}")]
	Connection { url: String, reason: String },

	/// The channel went away while a search was running.
	#[error("connection to {url} lost during search: {reason}")]
	ConnectionLost { url: String, reason: String },

	#[error("timeout after {secs}s waiting for: {condition}")]
	Timeout { secs: u64, condition: String },

	/// The search ran and ended in `failed`.
	#[error("{message}")]
	SearchFailed {
		kind: FailureKind,
		error_kind: Option<String>,
		message: String,
	},

	/// The backend answered a details request with an error.
	#[error("no details for flight {flight_id}: {error}")]
	DetailsRefused { flight_id: String, error: String },

	#[error(transparent)]
	Submit(#[from] SubmitError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

fn failure_code(kind: FailureKind) -> ErrorCode {
	match kind {
		FailureKind::Validation => ErrorCode::InvalidInput,
		FailureKind::Connection => ErrorCode::SessionError,
		FailureKind::Backend => ErrorCode::SearchFailed,
		FailureKind::Protocol => ErrorCode::ProtocolError,
	}
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::Invalid(_) => (ErrorCode::InvalidInput, None),
			CliError::ConfigRead { path, .. } | CliError::ConfigFormat { path, .. } => (
				ErrorCode::ConfigError,
				Some(serde_json::json!({ "path": path })),
			),
			CliError::Connection { url, .. } => (ErrorCode::SessionError, Some(serde_json::json!({ "url": url }))),
			CliError::ConnectionLost { url, reason } => (
				ErrorCode::SessionError,
				Some(serde_json::json!({ "url": url, "reason": reason })),
			),
			CliError::Timeout { secs, condition } => (
				ErrorCode::Timeout,
				Some(serde_json::json!({ "timeout_secs": secs, "condition": condition })),
			),
			CliError::SearchFailed { kind, error_kind, .. } => (
				failure_code(*kind),
				error_kind.as_ref().map(|title| serde_json::json!({ "error": title })),
			),
			CliError::DetailsRefused { flight_id, .. } => (
				ErrorCode::DetailsFailed,
				Some(serde_json::json!({ "flight_id": flight_id })),
			),
			CliError::Submit(SubmitError::Invalid(_)) => (ErrorCode::InvalidInput, None),
			CliError::Submit(SubmitError::NotConnected(state)) => (
				ErrorCode::SessionError,
				Some(serde_json::json!({ "connection": state })),
			),
			CliError::Submit(_) => (ErrorCode::SessionError, None),
			CliError::Io(_) => (ErrorCode::IoError, None),
			CliError::Json(_) | CliError::Anyhow(_) => (ErrorCode::InternalError, None),
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}
