//! Session store: runs the transition function and executes its effects

use super::{
    new_scammer_identifier, transition, ConversationSession, ExchangeReply, SessionEffect,
    SessionEvent, TransitionError, Turn,
};
use crate::config::DEFAULT_CLIENT_LABEL;
use crate::transport::{Method, Transport, TransportError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub const START_ENDPOINT: &str = "start-conversation";
pub const CONTINUE_ENDPOINT: &str = "continue-conversation";

/// Why a send or retry produced no assistant turn
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Refused locally; nothing was sent
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    /// The exchange failed; the user turn carries the error
    #[error(transparent)]
    Remote(#[from] TransportError),
    /// The session was reset while the exchange was in flight
    #[error("Session was reset before the reply arrived")]
    Discarded,
}

/// Owns one conversation session
pub struct SessionStore<T> {
    transport: Arc<T>,
    session: Arc<Mutex<ConversationSession>>,
    metadata: Arc<Value>,
}

impl<T: Transport + 'static> SessionStore<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            session: Arc::new(Mutex::new(ConversationSession::new(
                new_scammer_identifier(),
            ))),
            metadata: Arc::new(json!({ "source": DEFAULT_CLIENT_LABEL })),
        }
    }

    /// Metadata attached to start requests
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }

    pub async fn session(&self) -> ConversationSession {
        self.session.lock().await.clone()
    }

    /// Send a message and wait for the persona's reply
    pub async fn send(&self, text: impl Into<String>) -> Result<Turn, SessionError> {
        self.dispatch(SessionEvent::UserMessage { text: text.into() })
            .await
    }

    /// Re-send the failed last message
    pub async fn retry(&self) -> Result<Turn, SessionError> {
        self.dispatch(SessionEvent::Retry).await
    }

    /// Start over with a fresh scammer identifier
    pub async fn reset(&self) {
        let mut session = self.session.lock().await;
        let event = SessionEvent::Reset {
            scammer_identifier: new_scammer_identifier(),
        };
        match transition(&session, event) {
            Ok(result) => {
                if result.new_state.epoch != session.epoch {
                    tracing::info!(
                        conversation_id = ?session.conversation_id,
                        epoch = result.new_state.epoch,
                        "Session reset"
                    );
                }
                *session = result.new_state;
            }
            Err(e) => tracing::warn!(error = %e, "Reset rejected"),
        }
    }

    async fn dispatch(&self, event: SessionEvent) -> Result<Turn, SessionError> {
        let (effect, epoch) = {
            let mut session = self.session.lock().await;
            let result = transition(&session, event)?;
            let Some(effect) = result.effects.into_iter().next() else {
                return Err(TransitionError::InvalidTransition(
                    "event produced no exchange".to_string(),
                )
                .into());
            };
            *session = result.new_state;
            (effect, session.epoch)
        };

        // The exchange owns its outcome: it is folded into the session even
        // when the caller stops waiting.
        let exchange = tokio::spawn(run_exchange(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            Arc::clone(&self.metadata),
            effect,
            epoch,
        ));

        match exchange.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Exchange task failed");
                Err(SessionError::Remote(TransportError::network(format!(
                    "Exchange task failed: {e}"
                ))))
            }
        }
    }
}

/// Perform one exchange and fold its outcome into the session.
///
/// The session lock is not held while the request is in flight.
async fn run_exchange<T: Transport>(
    transport: Arc<T>,
    session: Arc<Mutex<ConversationSession>>,
    metadata: Arc<Value>,
    effect: SessionEffect,
    epoch: u64,
) -> Result<Turn, SessionError> {
    let outcome = execute(transport.as_ref(), &metadata, &effect).await;

    let mut session = session.lock().await;
    if session.epoch != epoch {
        tracing::debug!(
            sent_epoch = epoch,
            current_epoch = session.epoch,
            "Discarding reply for a reset session"
        );
        return Err(SessionError::Discarded);
    }

    // A reply the session cannot accept is handled like a malformed one so
    // the turn never stays outstanding.
    let applied = match outcome {
        Ok(reply) => transition(&session, SessionEvent::ReplyReceived { reply })
            .map_err(|e| TransportError::malformed(e.to_string())),
        Err(error) => Err(error),
    };

    match applied {
        Ok(result) => {
            *session = result.new_state;
            if effect.is_start() {
                tracing::info!(
                    conversation_id = ?session.conversation_id,
                    scammer_identifier = %session.scammer_identifier,
                    "Conversation started"
                );
            }
            session.turns.last().cloned().ok_or_else(|| {
                TransitionError::InvalidTransition("reply left no turn".to_string()).into()
            })
        }
        Err(error) => {
            tracing::warn!(
                conversation_id = ?session.conversation_id,
                kind = %error.kind,
                transient = error.kind.is_transient(),
                error = %error.message,
                "Conversation exchange failed"
            );
            let result = transition(
                &session,
                SessionEvent::SendFailed {
                    error: error.clone(),
                },
            )?;
            *session = result.new_state;
            Err(SessionError::Remote(error))
        }
    }
}

async fn execute<T: Transport>(
    transport: &T,
    metadata: &Value,
    effect: &SessionEffect,
) -> Result<ExchangeReply, TransportError> {
    match effect {
        SessionEffect::StartConversation {
            initial_message,
            scammer_identifier,
        } => {
            let body = json!({
                "initial_message": initial_message,
                "scammer_identifier": scammer_identifier,
                "metadata": metadata,
            });
            let data = transport
                .request(Method::Post, START_ENDPOINT, Some(body))
                .await?;
            parse_reply(data, true)
        }
        SessionEffect::ContinueConversation {
            conversation_id,
            message,
        } => {
            let body = json!({
                "conversation_id": conversation_id,
                "message": message,
            });
            let data = transport
                .request(Method::Post, CONTINUE_ENDPOINT, Some(body))
                .await?;
            parse_reply(data, false)
        }
    }
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    conversation_id: Option<String>,
    response: String,
    #[serde(default)]
    persona_used: Option<String>,
    /// Either an object with `scam_score` or a bare state name
    #[serde(default)]
    state: Option<Value>,
}

/// Parse an exchange reply. Start replies must carry the assigned id.
pub fn parse_reply(data: Value, require_id: bool) -> Result<ExchangeReply, TransportError> {
    let wire: WireReply = serde_json::from_value(data)
        .map_err(|e| TransportError::malformed(format!("Invalid conversation reply: {e}")))?;

    if require_id && wire.conversation_id.is_none() {
        return Err(TransportError::malformed(
            "Start reply is missing conversation_id",
        ));
    }

    let risk_score = wire
        .state
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|state| state.get("scam_score"))
        .and_then(Value::as_f64);

    Ok(ExchangeReply {
        conversation_id: wire.conversation_id,
        response: wire.response,
        persona_used: wire.persona_used,
        risk_score,
    })
}
