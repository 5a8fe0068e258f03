//! Schedule generation endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::error::ApiResult;
use crate::generator::ConstraintSelection;
use crate::models::Timetable;
use crate::voting::Caller;
use crate::AppState;

/// POST /api/courses/:course_id/timetables/generate body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub selection: ConstraintSelection,
    /// Publish the candidates as the new proposal set
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub course_id: String,
    pub published: bool,
    pub timetables: Vec<Timetable>,
}

/// POST /api/courses/:course_id/timetables/generate
///
/// 503 when no generator is configured, 502 when the generator fails.
pub async fn generate_timetables(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    caller: Caller,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let timetables = if request.publish {
        state
            .voting
            .generate_and_publish(&caller, &course_id, &request.selection)
            .await?
    } else {
        state
            .voting
            .generate(&caller, &course_id, &request.selection)
            .await?
    };

    Ok(Json(GenerateResponse {
        course_id,
        published: request.publish,
        timetables,
    }))
}
