//! Connection configuration.
//!
//! Keys follow the recognized client options (`transports`, `autoReconnect`,
//! `reconnectDelayMs`, `maxReconnectAttempts`) so a JSON config file can be
//! deserialized directly. Missing keys take the defaults below.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Endpoint used when nothing else is configured.
pub const DEFAULT_URL: &str = "http://localhost:8000";

/// Path used when the endpoint URL has none.
const DEFAULT_CHANNEL_PATH: &str = "/ws";

/// Transport flavours, tried in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
	/// Persistent WebSocket stream.
	DirectStream,
	/// HTTP long-polling.
	FallbackPoll,
}

impl fmt::Display for TransportKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransportKind::DirectStream => write!(f, "direct-stream"),
			TransportKind::FallbackPoll => write!(f, "fallback-poll"),
		}
	}
}

impl FromStr for TransportKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"direct-stream" => Ok(TransportKind::DirectStream),
			"fallback-poll" => Ok(TransportKind::FallbackPoll),
			_ => Err(format!("unknown transport: {s}")),
		}
	}
}

/// Endpoint plus transport and reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
	/// Backend URL (`http(s)://` or `ws(s)://`).
	pub url: String,
	/// Transport preference order.
	pub transports: Vec<TransportKind>,
	/// Retry after an unexpected disconnect or failed attempt.
	pub auto_reconnect: bool,
	/// Fixed delay between attempts.
	pub reconnect_delay_ms: u64,
	/// Retries allowed after the first attempt; the counter resets on every
	/// successful connection.
	pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			transports: vec![TransportKind::DirectStream, TransportKind::FallbackPoll],
			auto_reconnect: true,
			reconnect_delay_ms: 1000,
			max_reconnect_attempts: 5,
		}
	}
}

impl ConnectionConfig {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			..Self::default()
		}
	}

	pub fn reconnect_delay(&self) -> Duration {
		Duration::from_millis(self.reconnect_delay_ms)
	}

	/// Resolves the channel URL.
	///
	/// `http` maps to `ws` and `https` to `wss`; a bare host gets the
	/// `/ws` path.
	pub fn endpoint(&self) -> Result<Url> {
		let invalid = |reason: String| Error::InvalidEndpoint {
			url: self.url.clone(),
			reason,
		};

		let mut url = Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
		let scheme = match url.scheme() {
			"http" | "ws" => "ws",
			"https" | "wss" => "wss",
			other => return Err(invalid(format!("unsupported scheme '{other}'"))),
		};
		url.set_scheme(scheme)
			.map_err(|()| invalid(format!("cannot use scheme '{scheme}'")))?;

		if url.path().is_empty() || url.path() == "/" {
			url.set_path(DEFAULT_CHANNEL_PATH);
		}
		Ok(url)
	}
}
