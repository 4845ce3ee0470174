//! Pure session transition function
//!
//! Decides which remote operation a message needs and folds exchange
//! outcomes back into the conversation log. Performs no I/O.

use super::{
    ConversationSession, ExchangeReply, SessionEffect, SessionEvent, SessionPhase, Turn,
    TurnError, TurnMetadata,
};
use crate::transport::TransportError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationSession,
    pub effects: Vec<SessionEffect>,
}

impl TransitionResult {
    pub fn new(state: ConversationSession) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: SessionEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Events the session refuses to handle in its current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is still outstanding, wait for it before sending")]
    SessionBusy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("No failed message to retry")]
    NothingToRetry,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    session: &ConversationSession,
    event: SessionEvent,
) -> Result<TransitionResult, TransitionError> {
    match event {
        SessionEvent::UserMessage { text } => {
            if session.is_awaiting() {
                return Err(TransitionError::SessionBusy);
            }
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            let effect = route(session, &text);
            let mut next = session.clone();
            next.turns.push(Turn::user(text));
            next.awaiting = Some(next.turns.len() - 1);
            Ok(TransitionResult::new(next).with_effect(effect))
        }

        SessionEvent::Retry => {
            if session.is_awaiting() {
                return Err(TransitionError::SessionBusy);
            }
            let index = session
                .retryable_turn()
                .ok_or(TransitionError::NothingToRetry)?;

            let effect = route(session, &session.turns[index].content);
            let mut next = session.clone();
            next.turns[index].error = None;
            next.awaiting = Some(index);
            Ok(TransitionResult::new(next).with_effect(effect))
        }

        SessionEvent::ReplyReceived { reply } => {
            if !session.is_awaiting() {
                return Err(TransitionError::InvalidTransition(
                    "reply received with no outstanding message".to_string(),
                ));
            }
            apply_reply(session, reply)
        }

        SessionEvent::SendFailed { error } => {
            let index = session.awaiting.ok_or_else(|| {
                TransitionError::InvalidTransition(
                    "failure received with no outstanding message".to_string(),
                )
            })?;
            Ok(TransitionResult::new(apply_failure(session, index, &error)))
        }

        SessionEvent::Reset { scammer_identifier } => {
            if session.is_pristine() {
                return Ok(TransitionResult::new(session.clone()));
            }
            let mut next = ConversationSession::new(scammer_identifier);
            next.epoch = session.epoch + 1;
            Ok(TransitionResult::new(next))
        }
    }
}

/// Start until the service has assigned an id, continue afterwards
fn route(session: &ConversationSession, message: &str) -> SessionEffect {
    match &session.conversation_id {
        Some(conversation_id) => SessionEffect::ContinueConversation {
            conversation_id: conversation_id.clone(),
            message: message.to_string(),
        },
        None => SessionEffect::StartConversation {
            initial_message: message.to_string(),
            scammer_identifier: session.scammer_identifier.clone(),
        },
    }
}

fn apply_reply(
    session: &ConversationSession,
    reply: ExchangeReply,
) -> Result<TransitionResult, TransitionError> {
    let conversation_id = match (&session.conversation_id, reply.conversation_id) {
        (Some(existing), _) => existing.clone(),
        (None, Some(assigned)) => assigned,
        (None, None) => {
            return Err(TransitionError::InvalidTransition(
                "start reply carried no conversation id".to_string(),
            ))
        }
    };

    let mut next = session.clone();
    next.conversation_id = Some(conversation_id);
    next.turns.push(Turn::assistant(
        reply.response,
        TurnMetadata {
            persona_used: reply.persona_used,
            risk_score: reply.risk_score,
        },
    ));
    next.awaiting = None;
    next.phase = SessionPhase::Active;
    Ok(TransitionResult::new(next))
}

fn apply_failure(
    session: &ConversationSession,
    index: usize,
    error: &TransportError,
) -> ConversationSession {
    let mut next = session.clone();
    if let Some(turn) = next.turns.get_mut(index) {
        turn.error = Some(TurnError {
            kind: error.kind,
            message: error.message.clone(),
        });
    }
    next.awaiting = None;
    next.phase = SessionPhase::Errored {
        kind: error.kind,
        message: error.message.clone(),
    };
    next
}
