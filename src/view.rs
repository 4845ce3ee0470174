//! Render-ready projection of console state
//!
//! Pure functions from the poller's [`SyncState`] and a
//! [`ConversationSession`] to display records. The current time is an
//! argument, so identical inputs always give identical output.

use crate::polling::SyncState;
use crate::session::{ConversationSession, Role, SessionPhase};
use crate::snapshot::{
    ConnectionStatus, Fragment, NetworkGraph, Overview, RiskDistribution, Severity,
};
use crate::transport::TransportErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Placeholder for values that have never been fetched
pub const MISSING: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Positive,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub title: &'static str,
    /// Formatted count, or [`MISSING`]
    pub value: String,
    pub stale: bool,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskBar {
    pub level: &'static str,
    pub count: u64,
    pub percent: u8,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub epoch_millis: i64,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRow {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub content: String,
    pub tone: Tone,
    pub age: String,
}

/// A list panel with the freshness of the fragment behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel<T> {
    pub items: Vec<T>,
    /// False until the fragment has been fetched once
    pub loaded: bool,
    pub stale: bool,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedEntity {
    pub label: String,
    pub entity_type: String,
    /// Number of distinct scammers linked to this entity
    pub scammers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub scammers: usize,
    pub entities: usize,
    pub shared_entities: Vec<SharedEntity>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub status: StatusBadge,
    pub system_status: Option<String>,
    pub cards: Vec<MetricCard>,
    pub risk: Vec<RiskBar>,
    pub chart: Panel<ChartPoint>,
    pub feed: Panel<FeedRow>,
    pub network: Option<NetworkSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatBubble {
    pub side: Side,
    pub text: String,
    /// `persona · risk NN%` for replies
    pub caption: Option<String>,
    pub error: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatView {
    pub conversation_id: Option<String>,
    pub bubbles: Vec<ChatBubble>,
    pub status_line: String,
    pub can_send: bool,
    pub can_retry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleView {
    pub dashboard: DashboardView,
    pub chat: ChatView,
}

pub fn project(
    state: &SyncState,
    session: &ConversationSession,
    now: DateTime<Utc>,
) -> ConsoleView {
    ConsoleView {
        dashboard: dashboard(state, now),
        chat: chat(session),
    }
}

pub fn dashboard(state: &SyncState, now: DateTime<Utc>) -> DashboardView {
    let snapshot = &state.snapshot;
    let overview = &snapshot.overview;
    let card = |title, pick: fn(&Overview) -> u64| MetricCard {
        title,
        value: overview
            .value
            .as_ref()
            .map_or_else(|| MISSING.to_string(), |o| format_count(pick(o))),
        stale: overview.is_stale(),
        updated: updated_label(overview, now),
    };

    DashboardView {
        status: status_badge(state.status),
        system_status: overview
            .value
            .as_ref()
            .and_then(|o| o.system_status.clone()),
        cards: vec![
            card("Active Threats", |o| o.active_threats),
            card("Total Blocked", |o| o.total_blocked),
            card("Scams Prevented", |o| o.scams_prevented),
        ],
        risk: overview
            .value
            .as_ref()
            .map(|o| risk_bars(&o.risk_distribution))
            .unwrap_or_default(),
        chart: panel(&snapshot.threat_landscape, now, |points| {
            points
                .iter()
                .map(|p| ChartPoint {
                    epoch_millis: p.timestamp.timestamp_millis(),
                    label: p.timestamp.format("%b %d %H:%M").to_string(),
                    count: p.count,
                })
                .collect()
        }),
        feed: panel(&snapshot.recent_activity, now, |items| {
            items
                .iter()
                .map(|item| FeedRow {
                    id: item.id.clone(),
                    activity_type: item.activity_type.clone(),
                    content: item.content.clone(),
                    tone: match item.severity {
                        Severity::Info => Tone::Neutral,
                        Severity::Warning => Tone::Warning,
                    },
                    age: age_label(now, item.timestamp),
                })
                .collect()
        }),
        network: snapshot.network_graph.value.as_ref().map(|graph| {
            let mut summary = network_summary(graph);
            summary.stale = snapshot.network_graph.is_stale();
            summary
        }),
    }
}

pub fn chat(session: &ConversationSession) -> ChatView {
    let bubbles = session
        .turns
        .iter()
        .enumerate()
        .map(|(index, turn)| ChatBubble {
            side: match turn.role {
                Role::User => Side::Right,
                Role::Assistant => Side::Left,
            },
            text: turn.content.clone(),
            caption: turn.metadata.as_ref().and_then(|m| {
                reply_caption(m.persona_used.as_deref(), m.risk_score)
            }),
            error: turn
                .error
                .as_ref()
                .map(|e| error_text(e.kind, &e.message)),
            pending: session.awaiting == Some(index),
        })
        .collect();

    let status_line = if session.is_awaiting() {
        "Waiting for reply".to_string()
    } else {
        match &session.phase {
            SessionPhase::Uninitialized => "New conversation".to_string(),
            SessionPhase::Active => match &session.conversation_id {
                Some(id) => format!("Conversation {id}"),
                None => "Conversation active".to_string(),
            },
            SessionPhase::Errored { kind, message } => {
                format!("Last message failed: {}", error_text(*kind, message))
            }
        }
    };

    ChatView {
        conversation_id: session.conversation_id.clone(),
        bubbles,
        status_line,
        can_send: !session.is_awaiting(),
        can_retry: session.retryable_turn().is_some(),
    }
}

fn status_badge(status: ConnectionStatus) -> StatusBadge {
    match status {
        ConnectionStatus::Connecting => StatusBadge {
            label: "Connecting",
            tone: Tone::Neutral,
        },
        ConnectionStatus::Online => StatusBadge {
            label: "System Online",
            tone: Tone::Positive,
        },
        ConnectionStatus::Offline => StatusBadge {
            label: "System Offline",
            tone: Tone::Critical,
        },
    }
}

fn risk_bars(distribution: &RiskDistribution) -> Vec<RiskBar> {
    let total = distribution.total();
    [
        ("high", distribution.high, Tone::Critical),
        ("medium", distribution.medium, Tone::Warning),
        ("low", distribution.low, Tone::Positive),
    ]
    .into_iter()
    .map(|(level, count, tone)| RiskBar {
        level,
        count,
        percent: percent_of(count, total),
        tone,
    })
    .collect()
}

fn panel<T, R>(
    fragment: &Fragment<T>,
    now: DateTime<Utc>,
    rows: impl FnOnce(&T) -> Vec<R>,
) -> Panel<R> {
    Panel {
        items: fragment.value.as_ref().map(rows).unwrap_or_default(),
        loaded: fragment.value.is_some(),
        stale: fragment.is_stale(),
        updated: updated_label(fragment, now),
    }
}

fn updated_label<T>(fragment: &Fragment<T>, now: DateTime<Utc>) -> Option<String> {
    fragment
        .fetched_at
        .map(|at| format!("updated {}", age_label(now, at)))
}

/// Scammer and entity counts, plus entities linked to several scammers
pub fn network_summary(graph: &NetworkGraph) -> NetworkSummary {
    let scammers: HashSet<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.is_scammer())
        .map(|n| n.id.as_str())
        .collect();

    let mut linked: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for link in &graph.links {
        let (source, target) = (link.source.as_str(), link.target.as_str());
        if scammers.contains(source) && !scammers.contains(target) {
            linked.entry(target).or_default().insert(source);
        } else if scammers.contains(target) && !scammers.contains(source) {
            linked.entry(source).or_default().insert(target);
        }
    }

    let mut shared_entities: Vec<SharedEntity> = graph
        .nodes
        .iter()
        .filter(|n| !n.is_scammer())
        .filter_map(|n| {
            let count = linked.get(n.id.as_str()).map_or(0, BTreeSet::len);
            (count > 1).then(|| SharedEntity {
                label: n.label.clone(),
                entity_type: n.node_type.clone(),
                scammers: count,
            })
        })
        .collect();
    shared_entities.sort_by(|a, b| b.scammers.cmp(&a.scammers).then_with(|| a.label.cmp(&b.label)));

    NetworkSummary {
        scammers: scammers.len(),
        entities: graph.nodes.len() - graph.nodes.iter().filter(|n| n.is_scammer()).count(),
        shared_entities,
        stale: false,
    }
}

fn reply_caption(persona: Option<&str>, risk_score: Option<f64>) -> Option<String> {
    let risk = risk_score.map(|score| format!("risk {}%", score_percent(score)));
    match (persona, risk) {
        (Some(persona), Some(risk)) => Some(format!("{persona} · {risk}")),
        (Some(persona), None) => Some(persona.to_string()),
        (None, risk) => risk,
    }
}

fn error_text(kind: TransportErrorKind, message: &str) -> String {
    match kind {
        TransportErrorKind::Server => message.to_string(),
        TransportErrorKind::Network => format!("Connection problem: {message}"),
        TransportErrorKind::Malformed => format!("Unexpected response: {message}"),
    }
}

/// Format a count with thousands separators
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Coarse relative age such as `12s ago` or `3h ago`
pub fn age_label(now: DateTime<Utc>, at: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 1 => "just now".to_string(),
        s if s < 60 => format!("{s}s ago"),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

/// Share of `count` in `total`, rounded; 0 when the total is 0
fn percent_of(count: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (u128::from(count) * 100 + u128::from(total) / 2) / u128::from(total);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn score_percent(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}
