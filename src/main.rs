use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shareorsteal::connection::{ConnectionRegistry, InMemoryConnectionRegistry};
use shareorsteal::eligibility::InMemoryEligibilityGate;
use shareorsteal::game::{EngineConfig, MatchEngine};
use shareorsteal::queue::LocationQueues;
use shareorsteal::shared::AppState;
use shareorsteal::websockets::websocket_handler;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shareorsteal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Share or Steal matchmaking server");

    // Create shared application state with dependency injection
    let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
    let queues = Arc::new(LocationQueues::new(registry.clone()));
    let gate = Arc::new(InMemoryEligibilityGate::new());
    let engine = Arc::new(MatchEngine::new(
        queues,
        registry.clone(),
        gate,
        EngineConfig::default(),
    ));

    let app_state = AppState::new(registry, engine);

    let app = Router::new()
        .route("/", get(|| async { "Share or Steal matchmaking server" }))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // run our app with hyper, listening globally on port 3000
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
