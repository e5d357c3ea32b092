//! Endpoint handlers. Every handler runs behind the full gate chain.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::scripts::{DispatchResult, ScriptTarget};

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub authenticated: bool,
}

#[derive(Serialize)]
pub struct Welcome {
    pub message: &'static str,
}

/// Body of `POST /run-script`.
#[derive(Debug, Deserialize)]
pub struct RunScriptRequest {
    pub script_name: String,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Serialize)]
pub struct ScriptListing {
    pub scripts: Vec<ScriptTarget>,
}

pub async fn health() -> Json<HealthStatus> {
    tracing::info!("Health check called with valid API key");
    Json(HealthStatus {
        status: "ok",
        authenticated: true,
    })
}

pub async fn root() -> Json<Welcome> {
    Json(Welcome {
        message: "Welcome to Script Runner API!",
    })
}

pub async fn run_script(
    State(state): State<AppState>,
    payload: Result<Json<RunScriptRequest>, JsonRejection>,
) -> Result<Json<DispatchResult>, ApiError> {
    let Json(request) = payload?;
    let parameters = request.parameters.unwrap_or_default();
    let shown = Value::Object(parameters.clone());
    tracing::info!(
        script = %request.script_name,
        parameters = %shown,
        "Running script"
    );

    let result = state
        .dispatcher
        .run(&request.script_name, parameters)
        .await?;
    Ok(Json(result))
}

pub async fn list_scripts(State(state): State<AppState>) -> Result<Json<ScriptListing>, ApiError> {
    let scripts = state.registry.list().await.map_err(|e| {
        tracing::error!(error = %e, "Error listing scripts");
        e
    })?;
    Ok(Json(ScriptListing { scripts }))
}

pub async fn script_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ScriptTarget>, ApiError> {
    tracing::info!(script = %name, "Getting script info");
    Ok(Json(state.registry.describe(&name).await?))
}
