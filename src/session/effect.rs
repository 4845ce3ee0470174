//! Remote operations produced by session transitions

/// Exchange to perform against the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Open a new conversation
    StartConversation {
        initial_message: String,
        scammer_identifier: String,
    },

    /// Add a message to an existing conversation
    ContinueConversation {
        conversation_id: String,
        message: String,
    },
}

impl SessionEffect {
    pub fn is_start(&self) -> bool {
        matches!(self, SessionEffect::StartConversation { .. })
    }
}
