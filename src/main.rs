//! Honeypot console - terminal front end
//!
//! Prints projected views as JSON on stdout and reads chat input from stdin.
//! Logs go to stderr.

use honeypot_console::polling::default_fragments;
use honeypot_console::view;
use honeypot_console::{
    ConsoleConfig, HttpTransport, LoggingTransport, PollingOrchestrator, SessionStore, Transport,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "honeypot_console=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ConsoleConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        client_label = %config.client_label,
        "Starting honeypot console"
    );

    let transport = Arc::new(LoggingTransport::new(HttpTransport::new(&config)?));

    let mut orchestrator =
        PollingOrchestrator::new(Arc::clone(&transport), default_fragments(&config));
    orchestrator.start();

    let store = Arc::new(
        SessionStore::new(Arc::clone(&transport))
            .with_metadata(json!({ "source": config.client_label })),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/dashboard" => {
                        let state = orchestrator.state().await;
                        emit(&view::dashboard(&state, chrono::Utc::now()));
                    }
                    "/reset" => {
                        store.reset().await;
                        emit(&view::chat(&store.session().await));
                    }
                    "/retry" => spawn_exchange(&store, None),
                    text => spawn_exchange(&store, Some(text.to_string())),
                }
            }
        }
    }

    tracing::info!("Shutting down");
    orchestrator.stop().await;
    Ok(())
}

/// Run a send (or a retry when `text` is `None`) without blocking input
fn spawn_exchange<T: Transport + 'static>(store: &Arc<SessionStore<T>>, text: Option<String>) {
    let store = Arc::clone(store);
    tokio::spawn(async move {
        let result = match text {
            Some(text) => store.send(text).await,
            None => store.retry().await,
        };
        if let Err(e) = result {
            tracing::info!(error = %e, "Exchange produced no reply");
        }
        emit(&view::chat(&store.session().await));
    });
}

fn emit<V: Serialize>(view: &V) {
    match serde_json::to_string(view) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize view"),
    }
}
