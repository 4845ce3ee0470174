//! Honeypot console - control-center client for the scam-detection service
//!
//! Polls the service's analytics endpoints into a live snapshot and drives
//! honeypot conversations against its conversational endpoints.

pub mod config;
pub mod polling;
pub mod session;
pub mod snapshot;
pub mod transport;
pub mod view;

pub use config::ConsoleConfig;
pub use polling::{PollingOrchestrator, SyncState};
pub use session::{ConversationSession, SessionError, SessionStore};
pub use snapshot::{ConnectionStatus, Snapshot};
pub use transport::{HttpTransport, LoggingTransport, Transport, TransportError};
