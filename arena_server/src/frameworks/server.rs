// Framework bootstrap for the arena server runtime.

use crate::frameworks::config;
use crate::interface_adapters::hub::ConnectionHub;
use crate::interface_adapters::protocol::JsonEncoder;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::{AppState, InMemoryPlayerStore, SystemClock};
use crate::use_cases::EventDispatcher;

use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let app = app(build_state());

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let settings = config::dispatcher_settings();
    tracing::debug!(
        grid_size = settings.tuning.grid_size,
        spacing = settings.tuning.spacing,
        player_radius = settings.tuning.player_radius,
        event_deadline_ms = settings.event_deadline.as_millis(),
        fanout_max_in_flight = settings.fanout.max_in_flight,
        snapshot_online_only = settings.snapshot.online_only,
        "arena configured"
    );

    // The hub is both the dispatcher's transport and the socket tasks' registry.
    let hub = ConnectionHub::new();
    let dispatcher = EventDispatcher::new(
        InMemoryPlayerStore::new(),
        hub.clone(),
        SystemClock,
        JsonEncoder,
        settings,
    );

    Arc::new(AppState {
        dispatcher: Arc::new(dispatcher),
        hub,
        outbound_capacity: config::OUTBOUND_QUEUE_CAPACITY,
        max_invalid_messages: config::MAX_INVALID_MESSAGES,
    })
}
