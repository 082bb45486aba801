use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use naturetalk_core::{CredentialResolver, DeviceState, DeviceStore};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    pub credentials: Arc<CredentialResolver>,
    pub devices: Arc<DeviceStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub credential: HealthCheck,
    pub devices: BTreeMap<String, DeviceState>,
    pub checked_at: String,
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let credential = credential_check(&state.credentials);
    let ready = credential.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "naturetalk-server runtime initialized".to_string(),
        },
        credential,
        devices: state.devices.snapshot(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn credential_check(credentials: &CredentialResolver) -> HealthCheck {
    if credentials.is_resolved() {
        HealthCheck { status: "ready", detail: "API key resolved".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("API key `{}` not resolved yet", credentials.env_var()),
        }
    }
}
