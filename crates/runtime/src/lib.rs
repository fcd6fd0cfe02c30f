//! Sky Travel runtime - one managed connection to the search backend.
//!
//! - **Config**: endpoint URL, transport preference and reconnect budget
//! - **Transport**: WebSocket or in-memory frame pipes behind [`Connector`]
//! - **Connection**: [`ConnectionManager`] drives connect/reconnect, tracks
//!   [`ConnectionState`] and dispatches inbound frames to named handlers
//! - **Handlers**: [`Subscription`] handles that unregister on drop
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │    skytravel     │  Search session controller
//! └────────┬─────────┘
//!          │ subscribe / emit / state
//! ┌────────▼─────────┐
//! │ skytravel-runtime│  This crate
//! │  ┌────────────┐  │
//! │  │ Manager    │  │  State machine + reconnect loop
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Transport  │  │  WebSocket / memory
//! │  └────────────┘  │
//! └──────────────────┘
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod transport;

pub use config::{ConnectionConfig, DEFAULT_URL, TransportKind};
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState};
pub use error::{Error, Result};
pub use handlers::{HandlerId, Subscription};
pub use transport::memory::{MemoryConnector, MemoryPeer, MemoryServer};
pub use transport::websocket::WebSocketConnector;
pub use transport::{Connector, TransportParts, TransportReceiver, TransportSender};
