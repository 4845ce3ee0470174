//! Conversation session types

use crate::transport::TransportErrorKind;
use serde::Serialize;
use uuid::Uuid;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The operator, playing the scammer
    User,
    /// The service's persona
    Assistant,
}

/// Annotations the service returns alongside a reply
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TurnMetadata {
    pub persona_used: Option<String>,
    /// Scam score in `[0, 1]`, when the service reported one
    pub risk_score: Option<f64>,
}

/// Why a user turn got no reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub metadata: Option<TurnMetadata>,
    pub error: Option<TurnError>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            metadata: None,
            error: None,
        }
    }

    pub fn assistant(content: impl Into<String>, metadata: TurnMetadata) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.role == Role::User && self.error.is_some()
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionPhase {
    /// No exchange has completed since creation or reset
    #[default]
    Uninitialized,
    /// The last exchange succeeded
    Active,
    /// The last exchange failed
    Errored {
        kind: TransportErrorKind,
        message: String,
    },
}

/// A single honeypot conversation as seen by the console
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSession {
    /// Assigned by the service on the first successful exchange
    pub conversation_id: Option<String>,
    pub scammer_identifier: String,
    pub turns: Vec<Turn>,
    pub phase: SessionPhase,
    /// Index of the user turn whose reply is outstanding
    pub awaiting: Option<usize>,
    /// Bumped by every effective reset
    pub epoch: u64,
}

impl ConversationSession {
    pub fn new(scammer_identifier: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            scammer_identifier: scammer_identifier.into(),
            turns: Vec::new(),
            phase: SessionPhase::Uninitialized,
            awaiting: None,
            epoch: 0,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Nothing has happened since creation or the last reset
    pub fn is_pristine(&self) -> bool {
        self.conversation_id.is_none()
            && self.turns.is_empty()
            && self.awaiting.is_none()
            && self.phase == SessionPhase::Uninitialized
    }

    /// Index of the user turn a retry would re-send
    pub fn retryable_turn(&self) -> Option<usize> {
        if !matches!(self.phase, SessionPhase::Errored { .. }) || self.is_awaiting() {
            return None;
        }
        let last = self.turns.len().checked_sub(1)?;
        self.turns[last].is_failed().then_some(last)
    }
}

/// Fresh identifier for the simulated scammer of a new session
pub fn new_scammer_identifier() -> String {
    format!("console-{}", Uuid::new_v4())
}
