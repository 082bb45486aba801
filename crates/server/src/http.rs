use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use naturetalk_skill::{EventContext, ResponseEnvelope};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::bootstrap::Application;
use crate::entry::{correlation_id_for, fault_response, log_received, EntryError, SkillService};
use crate::health::{health, HealthState};

/// `POST /` and `POST /skill` take a raw voice-platform event and always
/// answer 200 with a response envelope; `GET /health` reports readiness.
pub fn router(service: Arc<SkillService>, health_state: HealthState) -> Router {
    let skill = Router::new()
        .route("/", post(handle_event))
        .route("/skill", post(handle_event))
        .with_state(service);
    let health_routes = Router::new().route("/health", get(health)).with_state(health_state);

    skill.merge(health_routes)
}

pub fn app_router(app: &Application) -> Router {
    router(
        Arc::clone(&app.service),
        HealthState { credentials: Arc::clone(&app.credentials), devices: Arc::clone(&app.devices) },
    )
}

async fn handle_event(
    State(service): State<Arc<SkillService>>,
    body: Bytes,
) -> Json<ResponseEnvelope> {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(parse_error) => {
            let ctx = EventContext::new(Uuid::new_v4().to_string());
            log_received(&ctx, &String::from_utf8_lossy(&body));
            return Json(fault_response(&ctx, &EntryError::NotJson(parse_error)));
        }
    };

    let ctx = EventContext::new(correlation_id_for(&event));
    Json(service.handle(event, &ctx).await)
}

pub async fn serve(app: Application) -> std::io::Result<()> {
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.listening",
        correlation_id = "bootstrap",
        bind_address = %address,
        "skill endpoint started"
    );

    axum::serve(listener, app_router(&app)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(signal_error) = tokio::signal::ctrl_c().await {
        error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %signal_error,
            "failed to listen for ctrl-c; shutting down"
        );
    }
    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "naturetalk-server stopping"
    );
}
