use axum::{extract::{Query, State}, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    HazardsQuery, HazardsResponse, HealthResponse, LogHazardRequest, LogHazardResponse,
};
use crate::domain::errors::DomainError;

const DEFAULT_HAZARD_LIMIT: usize = 50;

fn error_response(e: DomainError) -> axum::response::Response {
    let status = match e {
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

pub async fn health(State(st): State<HttpState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "Backend running",
        pipeline: st.pipeline.get(),
        consumers: st.hub.consumer_count(),
    })
}

pub async fn log_hazard(
    State(st): State<HttpState>,
    Json(req): Json<LogHazardRequest>,
) -> impl IntoResponse {
    match st.hazards.log(req.into()).await {
        Ok(row) => {
            info!("Hazard logged: type={}, id={}", row.hazard_type, row.id);
            (
                StatusCode::CREATED,
                Json(LogHazardResponse {
                    message: "Hazard successfully logged".into(),
                    hazard_id: row.id,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn list_hazards(
    State(st): State<HttpState>,
    Query(query): Query<HazardsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HAZARD_LIMIT);
    let total = match st.hazards.count().await {
        Ok(total) => total,
        Err(e) => return error_response(e),
    };
    match st.hazards.recent(limit).await {
        Ok(hazards) => Json(HazardsResponse { total, hazards }).into_response(),
        Err(e) => error_response(e),
    }
}
