//! Snapshot of the service's operational metrics
//!
//! Each fragment is fetched on its own cadence. A fragment that fails to
//! refresh keeps its previous value and records the failure, so a stale
//! value is never confused with a freshly fetched zero.

use crate::transport::{TransportError, TransportErrorKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Connectivity as observed by the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No poll has completed yet
    #[default]
    Connecting,
    Online,
    Offline,
}

impl ConnectionStatus {
    /// Any successful poll means the service is reachable
    #[must_use]
    pub fn on_success(self) -> Self {
        ConnectionStatus::Online
    }

    /// Any failed poll flips to offline; there is no way back to connecting
    #[must_use]
    pub fn on_failure(self) -> Self {
        ConnectionStatus::Offline
    }
}

/// Which slice of the snapshot a poll refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Overview,
    ThreatLandscape,
    RecentActivity,
    NetworkGraph,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Overview => "overview",
            FragmentKind::ThreatLandscape => "threat_landscape",
            FragmentKind::RecentActivity => "recent_activity",
            FragmentKind::NetworkGraph => "network_graph",
        }
    }
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed fragment payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FragmentValue {
    Overview(Overview),
    ThreatLandscape(Vec<TrafficPoint>),
    RecentActivity(Vec<ActivityItem>),
    NetworkGraph(NetworkGraph),
}

impl FragmentValue {
    pub fn kind(&self) -> FragmentKind {
        match self {
            FragmentValue::Overview(_) => FragmentKind::Overview,
            FragmentValue::ThreatLandscape(_) => FragmentKind::ThreatLandscape,
            FragmentValue::RecentActivity(_) => FragmentKind::RecentActivity,
            FragmentValue::NetworkGraph(_) => FragmentKind::NetworkGraph,
        }
    }
}

// ============================================================================
// Fragment payloads
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RiskDistribution {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl RiskDistribution {
    pub fn total(&self) -> u64 {
        self.high.saturating_add(self.medium).saturating_add(self.low)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub active_threats: u64,
    pub total_blocked: u64,
    pub scams_prevented: u64,
    pub risk_distribution: RiskDistribution,
    /// Service's self-reported status string, when sent
    pub system_status: Option<String>,
}

/// One bucket of the threat landscape time series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficPoint {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// One entry of the recent activity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
    /// `scammer`, or the kind of extracted entity (`upi`, `phone`, ...)
    #[serde(rename = "type")]
    pub node_type: String,
    pub risk_score: f64,
}

impl NetworkNode {
    pub fn is_scammer(&self) -> bool {
        self.node_type == "scammer"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NetworkGraph {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
}

// ============================================================================
// Fragment bookkeeping
// ============================================================================

/// Most recent failed refresh of a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentFailure {
    pub kind: TransportErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// A value with its freshness record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment<T> {
    /// `None` until the first successful fetch
    pub value: Option<T>,
    /// Time of the last successful fetch
    pub fetched_at: Option<DateTime<Utc>>,
    /// Cleared by the next success
    pub last_failure: Option<FragmentFailure>,
    pub consecutive_failures: u32,
}

impl<T> Default for Fragment<T> {
    fn default() -> Self {
        Self {
            value: None,
            fetched_at: None,
            last_failure: None,
            consecutive_failures: 0,
        }
    }
}

impl<T> Fragment<T> {
    pub fn record_success(&mut self, value: T, at: DateTime<Utc>) {
        self.value = Some(value);
        self.fetched_at = Some(at);
        self.last_failure = None;
        self.consecutive_failures = 0;
    }

    /// Record a failed refresh. The value and its timestamp are left alone.
    pub fn record_failure(&mut self, error: &TransportError, at: DateTime<Utc>) {
        self.last_failure = Some(FragmentFailure {
            kind: error.kind,
            message: error.message.clone(),
            at,
        });
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// The latest refresh failed, so `value` (if any) is out of date
    pub fn is_stale(&self) -> bool {
        self.last_failure.is_some()
    }
}

/// All fragments. Fragments may reflect different moments in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub overview: Fragment<Overview>,
    pub threat_landscape: Fragment<Vec<TrafficPoint>>,
    pub recent_activity: Fragment<Vec<ActivityItem>>,
    pub network_graph: Fragment<NetworkGraph>,
}

impl Snapshot {
    pub fn record_success(&mut self, value: FragmentValue, at: DateTime<Utc>) {
        match value {
            FragmentValue::Overview(v) => self.overview.record_success(v, at),
            FragmentValue::ThreatLandscape(v) => self.threat_landscape.record_success(v, at),
            FragmentValue::RecentActivity(v) => self.recent_activity.record_success(v, at),
            FragmentValue::NetworkGraph(v) => self.network_graph.record_success(v, at),
        }
    }

    pub fn record_failure(&mut self, kind: FragmentKind, error: &TransportError, at: DateTime<Utc>) {
        match kind {
            FragmentKind::Overview => self.overview.record_failure(error, at),
            FragmentKind::ThreatLandscape => self.threat_landscape.record_failure(error, at),
            FragmentKind::RecentActivity => self.recent_activity.record_failure(error, at),
            FragmentKind::NetworkGraph => self.network_graph.record_failure(error, at),
        }
    }
}

/// Parse the timestamp shapes the service emits: RFC 3339, naive ISO
/// date-times (taken as UTC), and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
