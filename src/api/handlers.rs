use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::api::tools::{self, ToolDescriptor};
use crate::error::PlatformError;
use crate::store::Platform;

pub type AppState = Arc<Platform>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub fn status_for(err: &PlatformError) -> StatusCode {
    match err {
        PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
        PlatformError::DefaultBranchProtected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PlatformError::InvalidArguments { .. }
        | PlatformError::UnknownTool { .. }
        | PlatformError::ExecutionFailure { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: PlatformError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    }
    (status, Json(ErrorResponse::new(&err.to_string())))
}

pub async fn list_tools() -> Json<ListResponse<ToolDescriptor>> {
    let items = tools::catalogue();
    let total = items.len();
    Json(ListResponse { items, total })
}

/// Run a tool. The body is the tool's JSON arguments; an empty body means none.
pub async fn call_tool(
    State(platform): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let arguments = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            error_response(PlatformError::InvalidArguments {
                tool: name.clone(),
                message: err.to_string(),
            })
        })?
    };

    match tools::call_tool(&platform, &name, arguments).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => Err(error_response(err)),
    }
}
