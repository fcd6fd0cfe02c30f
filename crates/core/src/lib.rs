//! Sky Travel - real-time flight search sessions.
//!
//! [`SearchController`] turns a [`SearchRequest`] into one `start-search`
//! frame on a managed connection and folds the backend's status, completion
//! and error events into a single [`SearchSession`] value.
//!
//! ```ignore
//! use skytravel::{ConnectionConfig, ConnectionManager, SearchController, SearchRequest};
//!
//! let manager = ConnectionManager::new();
//! manager.open(ConnectionConfig::default());
//! let controller = SearchController::new(manager.handle());
//!
//! controller.submit(SearchRequest::new("Paris", "Tokyo", "2025-06-01"))?;
//! let mut session = controller.watch();
//! while session.borrow().is_active() {
//!     session.changed().await?;
//! }
//! ```

pub mod controller;
pub mod error;
pub mod session;

pub use controller::{Clock, SearchController};
pub use error::{Result, SubmitError};
pub use session::{
	CONNECTION_LOST_MESSAGE, FailureKind, NO_CONNECTION_MESSAGE, STARTING_MESSAGE, SUBMITTING_MESSAGE, SearchSession,
	SessionPhase, SessionState,
};
pub use skytravel_protocol::{
	AiAnalysis, Baggage, CalendarDate, FlightOffer, RecommendationResult, SearchRequest, SessionToken, ValidationError,
};
pub use skytravel_runtime::{ConnectionConfig, ConnectionHandle, ConnectionManager, ConnectionState, TransportKind};
