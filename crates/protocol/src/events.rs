//! Event names, payload shapes and the frame envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::SearchRequest;
use crate::result::RecommendationResult;

/// Outbound: start one search.
pub const START_SEARCH: &str = "start-search";
/// Inbound: progress narration.
pub const SEARCH_STATUS: &str = "search-status";
/// Inbound: terminal success.
pub const SEARCH_COMPLETE: &str = "search-complete";
/// Inbound: terminal failure.
pub const SEARCH_ERROR: &str = "search-error";
/// Inbound: greeting sent by the server right after connecting.
pub const CONNECTION_ACK: &str = "connection-ack";
/// Outbound: ask for booking details of one offer.
pub const GET_FLIGHT_DETAILS: &str = "get-flight-details";
/// Inbound: answer to [`GET_FLIGHT_DETAILS`].
pub const FLIGHT_DETAILS: &str = "flight-details-response";
/// Inbound: [`GET_FLIGHT_DETAILS`] was refused.
pub const FLIGHT_DETAILS_ERROR: &str = "flight-details-error";

/// Identifies one submitted search on the client side.
pub type SessionToken = u64;

/// JSON envelope for every message on the channel.
///
/// ```json
/// {"event": "search-status", "data": {"message": "..."}, "session": 3}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
	pub event: String,
	#[serde(default)]
	pub data: Value,
	/// Token of the search this frame belongs to, when the peer knows it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session: Option<SessionToken>,
}

impl Frame {
	pub fn new(event: impl Into<String>, data: Value) -> Self {
		Self {
			event: event.into(),
			data,
			session: None,
		}
	}

	pub fn with_session(mut self, session: Option<SessionToken>) -> Self {
		self.session = session;
		self
	}

	/// Decodes [`data`](Self::data) into a typed payload.
	pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
		T::deserialize(&self.data)
	}
}

/// `search-status` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
	/// Stage of the search, e.g. `searching` or `analyzing`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	pub message: String,
}

/// `search-complete` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
	pub data: RecommendationResult,
	/// The criteria the backend answered, echoed back.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub search_params: Option<SearchRequest>,
}

/// `search-error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Short error title.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub message: String,
}

/// `connection-ack` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAck {
	#[serde(default)]
	pub message: Option<String>,
	/// Server-side id of this connection.
	#[serde(default)]
	pub sid: Option<String>,
}

/// `get-flight-details` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetailsRequest {
	pub flight_id: String,
}

/// `flight-details-response` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetails {
	pub flight_id: String,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub booking_ready: bool,
}

/// `flight-details-error` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetailsError {
	#[serde(default)]
	pub error: String,
}

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
	StartSearch(SearchRequest),
	GetFlightDetails(FlightDetailsRequest),
}

impl ClientEvent {
	pub fn name(&self) -> &'static str {
		match self {
			ClientEvent::StartSearch(_) => START_SEARCH,
			ClientEvent::GetFlightDetails(_) => GET_FLIGHT_DETAILS,
		}
	}

	pub fn into_frame(self) -> serde_json::Result<Frame> {
		let name = self.name();
		let data = match self {
			ClientEvent::StartSearch(request) => serde_json::to_value(request)?,
			ClientEvent::GetFlightDetails(request) => serde_json::to_value(request)?,
		};
		Ok(Frame::new(name, data))
	}
}

/// Messages the server pushes.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
	Status(StatusPayload),
	Complete(CompletePayload),
	Error(ErrorPayload),
	ConnectionAck(ConnectionAck),
	FlightDetails(FlightDetails),
	FlightDetailsError(FlightDetailsError),
}

impl ServerEvent {
	/// Decodes a frame into a typed event.
	///
	/// Returns `Ok(None)` for event names outside the known set.
	pub fn from_frame(frame: &Frame) -> serde_json::Result<Option<Self>> {
		let event = match frame.event.as_str() {
			SEARCH_STATUS => ServerEvent::Status(frame.decode()?),
			SEARCH_COMPLETE => ServerEvent::Complete(frame.decode()?),
			SEARCH_ERROR => ServerEvent::Error(frame.decode()?),
			CONNECTION_ACK => ServerEvent::ConnectionAck(frame.decode()?),
			FLIGHT_DETAILS => ServerEvent::FlightDetails(frame.decode()?),
			FLIGHT_DETAILS_ERROR => ServerEvent::FlightDetailsError(frame.decode()?),
			_ => return Ok(None),
		};
		Ok(Some(event))
	}
}
