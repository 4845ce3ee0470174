//! Conversation session state machine
//!
//! A pure transition function decides which remote operation each event
//! needs; the store executes it and folds the outcome back in.

mod effect;
mod event;
mod state;
mod store;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::SessionEffect;
pub use event::{ExchangeReply, SessionEvent};
pub use state::{
    new_scammer_identifier, ConversationSession, Role, SessionPhase, Turn, TurnError,
    TurnMetadata,
};
pub use store::{parse_reply, SessionError, SessionStore, CONTINUE_ENDPOINT, START_ENDPOINT};
pub use transition::{transition, TransitionError, TransitionResult};
