//! Polling orchestrator
//!
//! Keeps the snapshot fresh by polling each fragment independently and
//! tracks connectivity from the poll outcomes.

mod fragment;
mod orchestrator;
mod state;

#[cfg(test)]
mod proptests;

pub use fragment::{
    default_fragments, parse_network_graph, parse_overview, parse_recent_activity,
    parse_threat_landscape, FragmentSpec, ParseFn, NETWORK_GRAPH_ENDPOINT, OVERVIEW_ENDPOINT,
    RECENT_ACTIVITY_ENDPOINT, THREAT_LANDSCAPE_ENDPOINT,
};
pub use orchestrator::PollingOrchestrator;
pub use state::SyncState;
