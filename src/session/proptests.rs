//! Property-based tests for the session state machine
//!
//! These tests drive random event sequences through `transition` and check
//! the routing and log invariants after every step.

use super::*;
use crate::transport::{TransportError, TransportErrorKind};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_reply() -> impl Strategy<Value = ExchangeReply> {
    (
        proptest::option::of("c[0-9]{1,3}"),
        "[a-zA-Z ]{1,30}",
        proptest::option::of(prop_oneof![Just("elderly"), Just("student")]),
        proptest::option::of(0.0f64..=1.0),
    )
        .prop_map(|(id, response, persona, risk)| ExchangeReply {
            conversation_id: id,
            response,
            persona_used: persona.map(str::to_string),
            risk_score: risk,
        })
}

fn arb_error() -> impl Strategy<Value = TransportError> {
    prop_oneof![
        Just(TransportErrorKind::Network),
        Just(TransportErrorKind::Server),
        Just(TransportErrorKind::Malformed),
    ]
    .prop_map(|kind| TransportError::new(kind, "failed"))
}

fn arb_event() -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        3 => "[a-zA-Z ]{0,20}".prop_map(|text| SessionEvent::UserMessage { text }),
        1 => Just(SessionEvent::Retry),
        3 => arb_reply().prop_map(|reply| SessionEvent::ReplyReceived { reply }),
        2 => arb_error().prop_map(|error| SessionEvent::SendFailed { error }),
        1 => "[a-z]{4}".prop_map(|id| SessionEvent::Reset {
            scammer_identifier: format!("console-{id}"),
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Start is emitted only while no id exists; continue always carries it.
    #[test]
    fn routing_follows_conversation_id(events in proptest::collection::vec(arb_event(), 1..40)) {
        let mut session = ConversationSession::new("console-seed");
        for event in events {
            let Ok(result) = transition(&session, event) else { continue };
            for effect in &result.effects {
                match effect {
                    SessionEffect::StartConversation { scammer_identifier, .. } => {
                        prop_assert!(session.conversation_id.is_none());
                        prop_assert_eq!(scammer_identifier, &session.scammer_identifier);
                    }
                    SessionEffect::ContinueConversation { conversation_id, .. } => {
                        prop_assert_eq!(Some(conversation_id), session.conversation_id.as_ref());
                    }
                }
            }
            session = result.new_state;
        }
    }

    /// Outside of reset, turns are only ever appended and never reordered,
    /// and the awaiting index always points at a user turn.
    #[test]
    fn log_is_append_only(events in proptest::collection::vec(arb_event(), 1..40)) {
        let mut session = ConversationSession::new("console-seed");
        for event in events {
            let is_reset = matches!(event, SessionEvent::Reset { .. });
            let Ok(result) = transition(&session, event) else { continue };
            let next = result.new_state;

            if is_reset {
                prop_assert!(next.is_pristine());
            } else {
                prop_assert!(next.turns.len() >= session.turns.len());
                for (before, after) in session.turns.iter().zip(&next.turns) {
                    prop_assert_eq!(before.role, after.role);
                    prop_assert_eq!(&before.content, &after.content);
                }
            }
            if let Some(index) = next.awaiting {
                prop_assert_eq!(next.turns[index].role, Role::User);
            }
            session = next;
        }
    }

    /// Once assigned, the conversation id only goes away through reset.
    #[test]
    fn id_survives_failures(events in proptest::collection::vec(arb_event(), 1..40)) {
        let mut session = ConversationSession::new("console-seed");
        for event in events {
            let is_reset = matches!(event, SessionEvent::Reset { .. });
            let Ok(result) = transition(&session, event) else { continue };
            if !is_reset && session.conversation_id.is_some() {
                prop_assert_eq!(&result.new_state.conversation_id, &session.conversation_id);
            }
            session = result.new_state;
        }
    }

    /// Every accepted message or retry produces exactly one exchange.
    #[test]
    fn one_exchange_per_accepted_send(events in proptest::collection::vec(arb_event(), 1..40)) {
        let mut session = ConversationSession::new("console-seed");
        for event in events {
            let sends = matches!(event, SessionEvent::UserMessage { .. } | SessionEvent::Retry);
            let was_awaiting = session.is_awaiting();
            let Ok(result) = transition(&session, event) else { continue };

            let expected = usize::from(sends);
            prop_assert_eq!(result.effects.len(), expected);
            if sends {
                prop_assert!(!was_awaiting);
                prop_assert!(result.new_state.is_awaiting());
            }
            session = result.new_state;
        }
    }
}
