//! Fragment specifications and payload parsers
//!
//! Payloads arrive as untyped JSON inside the envelope. Each parser checks
//! the shape before the value is trusted; anything unexpected is reported as
//! `Malformed` and the previous value stays in place.

use crate::config::ConsoleConfig;
use crate::snapshot::{
    parse_timestamp, ActivityItem, FragmentKind, FragmentValue, NetworkGraph, NetworkLink,
    NetworkNode, Overview, RiskDistribution, Severity, TrafficPoint,
};
use crate::transport::TransportError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub const OVERVIEW_ENDPOINT: &str = "analytics/overview";
pub const THREAT_LANDSCAPE_ENDPOINT: &str = "analytics/threat-landscape";
pub const RECENT_ACTIVITY_ENDPOINT: &str = "analytics/recent-activity";
pub const NETWORK_GRAPH_ENDPOINT: &str = "analytics/network-graph";

pub type ParseFn = fn(Value) -> Result<FragmentValue, TransportError>;

/// How one fragment is polled
#[derive(Debug, Clone)]
pub struct FragmentSpec {
    pub kind: FragmentKind,
    pub endpoint: String,
    pub interval: Duration,
    pub parse: ParseFn,
}

impl FragmentSpec {
    pub fn new(kind: FragmentKind, endpoint: impl Into<String>, interval: Duration) -> Self {
        let parse: ParseFn = match kind {
            FragmentKind::Overview => parse_overview,
            FragmentKind::ThreatLandscape => parse_threat_landscape,
            FragmentKind::RecentActivity => parse_recent_activity,
            FragmentKind::NetworkGraph => parse_network_graph,
        };
        Self {
            kind,
            endpoint: endpoint.into(),
            interval,
            parse,
        }
    }
}

/// The fragments polled by the console, with cadences from configuration
pub fn default_fragments(config: &ConsoleConfig) -> Vec<FragmentSpec> {
    let mut specs = vec![
        FragmentSpec::new(
            FragmentKind::Overview,
            OVERVIEW_ENDPOINT,
            config.overview_interval,
        ),
        FragmentSpec::new(
            FragmentKind::ThreatLandscape,
            THREAT_LANDSCAPE_ENDPOINT,
            config.threat_landscape_interval,
        ),
        FragmentSpec::new(
            FragmentKind::RecentActivity,
            RECENT_ACTIVITY_ENDPOINT,
            config.recent_activity_interval,
        ),
    ];
    if let Some(interval) = config.network_graph_interval {
        specs.push(FragmentSpec::new(
            FragmentKind::NetworkGraph,
            NETWORK_GRAPH_ENDPOINT,
            interval,
        ));
    }
    specs
}

fn from_payload<T: DeserializeOwned>(kind: FragmentKind, data: Value) -> Result<T, TransportError> {
    serde_json::from_value(data)
        .map_err(|e| TransportError::malformed(format!("Invalid {kind} payload: {e}")))
}

fn timestamp(kind: FragmentKind, raw: &str) -> Result<chrono::DateTime<chrono::Utc>, TransportError> {
    parse_timestamp(raw)
        .ok_or_else(|| TransportError::malformed(format!("Invalid {kind} timestamp: {raw:?}")))
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct OverviewPayload {
    active_threats: u64,
    total_blocked: u64,
    scams_prevented: u64,
    #[serde(default)]
    risk_distribution: HashMap<String, u64>,
    #[serde(default)]
    system_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreatLandscapePayload {
    time_series: Vec<TrafficPointPayload>,
}

#[derive(Debug, Deserialize)]
struct TrafficPointPayload {
    timestamp: String,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct RecentActivityPayload {
    activities: Vec<ActivityPayload>,
}

#[derive(Debug, Deserialize)]
struct ActivityPayload {
    id: String,
    #[serde(rename = "type")]
    activity_type: String,
    content: String,
    timestamp: String,
    severity: SeverityPayload,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SeverityPayload {
    Info,
    Warning,
}

#[derive(Debug, Deserialize)]
struct NetworkGraphPayload {
    nodes: Vec<NetworkNodePayload>,
    links: Vec<NetworkLinkPayload>,
}

#[derive(Debug, Deserialize)]
struct NetworkNodePayload {
    id: String,
    label: String,
    #[serde(rename = "type")]
    node_type: String,
    risk_score: f64,
}

#[derive(Debug, Deserialize)]
struct NetworkLinkPayload {
    source: String,
    target: String,
    #[serde(rename = "type")]
    link_type: String,
}

// ============================================================================
// Parsers
// ============================================================================

pub fn parse_overview(data: Value) -> Result<FragmentValue, TransportError> {
    let payload: OverviewPayload = from_payload(FragmentKind::Overview, data)?;
    let level = |name: &str| payload.risk_distribution.get(name).copied().unwrap_or(0);

    Ok(FragmentValue::Overview(Overview {
        active_threats: payload.active_threats,
        total_blocked: payload.total_blocked,
        scams_prevented: payload.scams_prevented,
        risk_distribution: RiskDistribution {
            high: level("high"),
            medium: level("medium"),
            low: level("low"),
        },
        system_status: payload.system_status,
    }))
}

/// Points come back chronological; they are re-sorted anyway so the chart
/// never draws backwards.
pub fn parse_threat_landscape(data: Value) -> Result<FragmentValue, TransportError> {
    let kind = FragmentKind::ThreatLandscape;
    let payload: ThreatLandscapePayload = from_payload(kind, data)?;

    let mut points = payload
        .time_series
        .into_iter()
        .map(|p| {
            Ok(TrafficPoint {
                timestamp: timestamp(kind, &p.timestamp)?,
                count: p.count,
            })
        })
        .collect::<Result<Vec<_>, TransportError>>()?;
    points.sort_by_key(|p| p.timestamp);

    Ok(FragmentValue::ThreatLandscape(points))
}

/// Newest first, one entry per id.
pub fn parse_recent_activity(data: Value) -> Result<FragmentValue, TransportError> {
    let kind = FragmentKind::RecentActivity;
    let payload: RecentActivityPayload = from_payload(kind, data)?;

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(payload.activities.len());
    for activity in payload.activities {
        if !seen.insert(activity.id.clone()) {
            tracing::debug!(id = %activity.id, "Dropping duplicate activity");
            continue;
        }
        items.push(ActivityItem {
            timestamp: timestamp(kind, &activity.timestamp)?,
            id: activity.id,
            activity_type: activity.activity_type,
            content: activity.content,
            severity: match activity.severity {
                SeverityPayload::Info => Severity::Info,
                SeverityPayload::Warning => Severity::Warning,
            },
        });
    }
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(FragmentValue::RecentActivity(items))
}

pub fn parse_network_graph(data: Value) -> Result<FragmentValue, TransportError> {
    let payload: NetworkGraphPayload = from_payload(FragmentKind::NetworkGraph, data)?;

    Ok(FragmentValue::NetworkGraph(NetworkGraph {
        nodes: payload
            .nodes
            .into_iter()
            .map(|n| NetworkNode {
                id: n.id,
                label: n.label,
                node_type: n.node_type,
                risk_score: n.risk_score,
            })
            .collect(),
        links: payload
            .links
            .into_iter()
            .map(|l| NetworkLink {
                source: l.source,
                target: l.target,
                link_type: l.link_type,
            })
            .collect(),
    }))
}
