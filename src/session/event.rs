//! Events that drive session transitions

use crate::transport::TransportError;

/// A successful exchange, already parsed from the wire
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeReply {
    /// Present on start replies, optional on continue replies
    pub conversation_id: Option<String>,
    pub response: String,
    pub persona_used: Option<String>,
    pub risk_score: Option<f64>,
}

/// Input to the session transition function
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Operator submitted a message
    UserMessage { text: String },

    /// Re-send the failed last user turn
    Retry,

    /// The outstanding exchange succeeded
    ReplyReceived { reply: ExchangeReply },

    /// The outstanding exchange failed
    SendFailed { error: TransportError },

    /// Discard the conversation and start over as a new scammer
    Reset { scammer_identifier: String },
}
