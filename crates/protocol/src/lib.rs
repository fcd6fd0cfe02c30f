//! Wire types for the Sky Travel search channel.
//!
//! Every message on the channel is a JSON [`Frame`] naming one event from a
//! closed set and carrying that event's payload:
//!
//! | Direction | Event | Payload |
//! |---|---|---|
//! | out | [`START_SEARCH`] | [`SearchRequest`] |
//! | in | [`SEARCH_STATUS`] | [`StatusPayload`] |
//! | in | [`SEARCH_COMPLETE`] | [`CompletePayload`] |
//! | in | [`SEARCH_ERROR`] | [`ErrorPayload`] |
//! | in | [`CONNECTION_ACK`] | [`ConnectionAck`] |
//! | out | [`GET_FLIGHT_DETAILS`] | [`FlightDetailsRequest`] |
//! | in | [`FLIGHT_DETAILS`] | [`FlightDetails`] |
//! | in | [`FLIGHT_DETAILS_ERROR`] | [`FlightDetailsError`] |

mod events;
mod request;
mod result;

pub use events::{
	CONNECTION_ACK, ClientEvent, CompletePayload, ConnectionAck, ErrorPayload, FLIGHT_DETAILS,
	FLIGHT_DETAILS_ERROR, FlightDetails, FlightDetailsError, FlightDetailsRequest, Frame,
	GET_FLIGHT_DETAILS, SEARCH_COMPLETE, SEARCH_ERROR, SEARCH_STATUS, START_SEARCH, ServerEvent,
	SessionToken, StatusPayload,
};
pub use request::{CalendarDate, DATE_FORMAT, SearchRequest, ValidationError};
pub use result::{AiAnalysis, Baggage, FlightOffer, RecommendationResult};
