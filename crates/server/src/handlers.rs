//! Request handlers and wire types.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use nodes::RunOutcome;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::AppState;

pub const SERVICE_NAME: &str = "Restaurant-Agent";

const SUCCESS_MESSAGE: &str = "recommendation succeeded";
const FAILURE_MESSAGE: &str =
    "recommendation failed: no recommendation could be produced for this request";

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
}

/// `{success, message, data}` envelope returned by `/api/recommend`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl RecommendResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub features: Vec<&'static str>,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Restaurant-Agent service is running",
    }))
}

pub async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: "Restaurant recommendation agent with plan-execute orchestration",
        features: vec![
            "city and location resolution",
            "dining scenario classification",
            "nearby restaurant search",
            "automatic replanning on step failure",
        ],
    })
}

pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> (StatusCode, Json<RecommendResponse>) {
    let query = request.query.trim();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RecommendResponse::failure("query must not be empty")),
        );
    }

    info!(%query, "recommendation requested");
    let response = match state.orchestrator.run(query).await {
        Ok(RunOutcome::Completed { payload, state }) => {
            let data = state
                .final_result
                .as_deref()
                .and_then(|text| serde_json::from_str(text).ok())
                .or_else(|| serde_json::to_value(&payload).ok());
            info!(
                restaurant_count = payload.restaurant_count,
                "recommendation completed"
            );
            RecommendResponse {
                success: true,
                message: SUCCESS_MESSAGE.to_owned(),
                data,
            }
        }
        Ok(RunOutcome::Failed {
            error_info,
            replan_count,
            ..
        }) => {
            warn!(
                error_type = error_info.error_type.as_str(),
                replan_count,
                "recommendation ended in the error terminal"
            );
            RecommendResponse::failure(FAILURE_MESSAGE)
        }
        Err(err) => {
            error!(error = %err, "recommendation aborted");
            RecommendResponse::failure(format!("recommendation failed: {err}"))
        }
    };
    (StatusCode::OK, Json(response))
}
