//! Patrol Sync server.
//!
//! Wires the in-memory stores, the broadcast hub and the REST/websocket
//! surfaces, then serves until SIGINT or SIGTERM.

use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use patrol_sync::adapters::http::{api_router, MessagingHandlers, ScheduleHandlers, VehicleHandlers};
use patrol_sync::adapters::memory::{
    InMemoryConversationStore, InMemoryNotificationStore, InMemoryScheduleStore,
    InMemoryVehicleStore,
};
use patrol_sync::adapters::websocket::{websocket_router, BroadcastHub, RoomRegistry, WebSocketState};
use patrol_sync::application::handlers::{
    CreateScheduleHandler, DeleteScheduleHandler, MarkConversationReadHandler,
    MarkNotificationsReadHandler, Notifier, RegisterVehicleHandler, ReviewVehicleRequestHandler,
    SendMessageHandler, SubmitVehicleRequestHandler, UpdateScheduleHandler,
    UpdateVehicleConditionHandler,
};
use patrol_sync::application::{ChangePublisher, SyncQueries};
use patrol_sync::config::{AppConfig, ServerConfig};
use patrol_sync::domain::foundation::{Clock, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Push side
    let registry = Arc::new(RoomRegistry::new(config.sync.channel_capacity));
    let hub = Arc::new(BroadcastHub::new(Arc::clone(&registry)));
    hub.start();
    let publisher = Arc::new(ChangePublisher::new(hub.clone(), Arc::clone(&clock)));

    // Storage
    let schedules = Arc::new(InMemoryScheduleStore::new());
    let vehicles = Arc::new(InMemoryVehicleStore::new());
    let conversations = Arc::new(InMemoryConversationStore::new());
    let notifications = Arc::new(InMemoryNotificationStore::new());
    let notifier = Arc::new(Notifier::new(notifications.clone(), publisher.clone()));

    let queries = SyncQueries::new(
        schedules.clone(),
        vehicles.clone(),
        conversations.clone(),
        notifications.clone(),
        Arc::clone(&clock),
    );

    let schedule_handlers = ScheduleHandlers::new(
        Arc::new(CreateScheduleHandler::new(
            schedules.clone(),
            publisher.clone(),
            notifier.clone(),
        )),
        Arc::new(UpdateScheduleHandler::new(
            schedules.clone(),
            publisher.clone(),
            notifier.clone(),
        )),
        Arc::new(DeleteScheduleHandler::new(schedules.clone(), publisher.clone())),
        queries.clone(),
    );
    let vehicle_handlers = VehicleHandlers::new(
        Arc::new(RegisterVehicleHandler::new(vehicles.clone(), publisher.clone())),
        Arc::new(UpdateVehicleConditionHandler::new(
            vehicles.clone(),
            publisher.clone(),
        )),
        Arc::new(SubmitVehicleRequestHandler::new(
            vehicles.clone(),
            publisher.clone(),
        )),
        Arc::new(ReviewVehicleRequestHandler::new(
            vehicles.clone(),
            publisher.clone(),
            notifier.clone(),
        )),
        queries.clone(),
    );
    let messaging_handlers = MessagingHandlers::new(
        Arc::new(SendMessageHandler::new(conversations.clone(), publisher.clone())),
        Arc::new(MarkConversationReadHandler::new(
            conversations.clone(),
            publisher.clone(),
        )),
        Arc::new(MarkNotificationsReadHandler::new(
            notifications.clone(),
            publisher.clone(),
        )),
        queries,
    );

    // The timeout applies to REST calls only; websocket sessions are long-lived.
    let api = api_router(schedule_handlers, vehicle_handlers, messaging_handlers)
        .layer(TimeoutLayer::new(config.server.request_timeout()));
    let push = websocket_router().with_state(WebSocketState::new(
        Arc::clone(&registry),
        conversations,
    ));

    let app = api
        .merge(push)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Patrol sync listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.stop().await;
    tracing::info!("Patrol sync stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        if server.is_production() {
            tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
            return CorsLayer::new();
        }
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
