//! Property-based tests for poll outcome handling
//!
//! These tests verify the stale-read and connectivity rules hold across
//! arbitrary interleavings of fragment outcomes.

use super::state::SyncState;
use crate::snapshot::{
    ActivityItem, ConnectionStatus, FragmentKind, FragmentValue, Overview, RiskDistribution,
    Severity, TrafficPoint,
};
use crate::transport::{TransportError, TransportErrorKind};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_770_000_000 + secs, 0).unwrap()
}

fn arb_kind() -> impl Strategy<Value = FragmentKind> {
    prop_oneof![
        Just(FragmentKind::Overview),
        Just(FragmentKind::ThreatLandscape),
        Just(FragmentKind::RecentActivity),
    ]
}

fn arb_error() -> impl Strategy<Value = TransportError> {
    (
        prop_oneof![
            Just(TransportErrorKind::Network),
            Just(TransportErrorKind::Server),
            Just(TransportErrorKind::Malformed),
        ],
        "[a-z ]{1,20}",
    )
        .prop_map(|(kind, message)| TransportError::new(kind, message))
}

fn arb_value(kind: FragmentKind) -> BoxedStrategy<FragmentValue> {
    match kind {
        FragmentKind::Overview => (0u64..100, 0u64..100, 0u64..100, 0u64..10)
            .prop_map(|(active, blocked, prevented, high)| {
                FragmentValue::Overview(Overview {
                    active_threats: active,
                    total_blocked: blocked,
                    scams_prevented: prevented,
                    risk_distribution: RiskDistribution {
                        high,
                        medium: 0,
                        low: 0,
                    },
                    system_status: None,
                })
            })
            .boxed(),
        FragmentKind::ThreatLandscape => proptest::collection::vec(0u64..50, 0..5)
            .prop_map(|counts| {
                FragmentValue::ThreatLandscape(
                    counts
                        .into_iter()
                        .zip(0i64..)
                        .map(|(count, day)| TrafficPoint {
                            timestamp: at(day * 86_400),
                            count,
                        })
                        .collect(),
                )
            })
            .boxed(),
        FragmentKind::NetworkGraph => Just(FragmentValue::NetworkGraph(Default::default())).boxed(),
        FragmentKind::RecentActivity => {
            proptest::collection::vec("[a-z]{6}", 0..4)
                .prop_map(|ids| {
                    FragmentValue::RecentActivity(
                        ids.into_iter()
                            .map(|id| ActivityItem {
                                id,
                                activity_type: "message".to_string(),
                                content: "Message from scammer".to_string(),
                                timestamp: at(0),
                                severity: Severity::Warning,
                            })
                            .collect(),
                    )
                })
                .boxed()
        }
    }
}

/// One poll outcome for one fragment
fn arb_outcome() -> impl Strategy<Value = (FragmentKind, Result<FragmentValue, TransportError>)> {
    arb_kind().prop_flat_map(|kind| {
        prop_oneof![
            arb_value(kind).prop_map(Ok::<FragmentValue, TransportError>),
            arb_error().prop_map(Err::<FragmentValue, TransportError>),
        ]
        .prop_map(move |outcome| (kind, outcome))
    })
}

fn fragment_value(state: &SyncState, kind: FragmentKind) -> Option<FragmentValue> {
    let s = &state.snapshot;
    match kind {
        FragmentKind::Overview => s.overview.value.clone().map(FragmentValue::Overview),
        FragmentKind::ThreatLandscape => s
            .threat_landscape
            .value
            .clone()
            .map(FragmentValue::ThreatLandscape),
        FragmentKind::RecentActivity => s
            .recent_activity
            .value
            .clone()
            .map(FragmentValue::RecentActivity),
        FragmentKind::NetworkGraph => s.network_graph.value.clone().map(FragmentValue::NetworkGraph),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A fragment's value equals its last successful payload; failures never
    /// blank or replace it.
    #[test]
    fn value_tracks_last_success(outcomes in proptest::collection::vec(arb_outcome(), 1..40)) {
        let mut state = SyncState::default();
        let mut expected: std::collections::HashMap<FragmentKind, FragmentValue> =
            std::collections::HashMap::new();

        for (i, (kind, outcome)) in outcomes.into_iter().enumerate() {
            if let Ok(value) = &outcome {
                expected.insert(kind, value.clone());
            }
            state.apply(kind, outcome, at(i64::try_from(i).unwrap()));

            for k in [FragmentKind::Overview, FragmentKind::ThreatLandscape, FragmentKind::RecentActivity] {
                prop_assert_eq!(fragment_value(&state, k), expected.get(&k).cloned());
            }
        }
    }

    /// Status follows the latest outcome and never returns to Connecting.
    #[test]
    fn status_follows_latest_outcome(outcomes in proptest::collection::vec(arb_outcome(), 1..40)) {
        let mut state = SyncState::default();
        for (i, (kind, outcome)) in outcomes.into_iter().enumerate() {
            let succeeded = outcome.is_ok();
            state.apply(kind, outcome, at(i64::try_from(i).unwrap()));

            prop_assert_ne!(state.status, ConnectionStatus::Connecting);
            let expected = if succeeded { ConnectionStatus::Online } else { ConnectionStatus::Offline };
            prop_assert_eq!(state.status, expected);
        }
    }

    /// `fetched_at` only moves on success and failures are counted.
    #[test]
    fn freshness_bookkeeping(outcomes in proptest::collection::vec(arb_error(), 1..10)) {
        let mut state = SyncState::default();
        let FragmentValue::Overview(first) = crate::polling::parse_overview(serde_json::json!({
            "active_threats": 1, "total_blocked": 2, "scams_prevented": 3,
            "risk_distribution": {"high": 1}
        })).unwrap() else {
            unreachable!()
        };
        state.apply(FragmentKind::Overview, Ok(FragmentValue::Overview(first.clone())), at(0));

        let failures = outcomes.len();
        for (i, error) in outcomes.into_iter().enumerate() {
            state.apply(FragmentKind::Overview, Err(error), at(i64::try_from(i).unwrap() + 1));
        }

        prop_assert_eq!(state.snapshot.overview.fetched_at, Some(at(0)));
        prop_assert_eq!(state.snapshot.overview.value.as_ref(), Some(&first));
        prop_assert_eq!(state.snapshot.overview.consecutive_failures as usize, failures);
        prop_assert!(state.snapshot.overview.is_stale());
    }
}
