//! Proposal, voting and finalization endpoints
//!
//! Absent values (no proposals, no final timetable) are returned as JSON
//! `null` with 200.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::error::ApiResult;
use crate::models::{CourseStatus, FinalTimetable, Timetable, VoteResults};
use crate::voting::Caller;
use crate::AppState;

/// PUT /api/courses/:course_id/proposals body
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub timetables: Vec<Timetable>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub course_id: String,
    pub options: Vec<u32>,
}

/// POST /api/courses/:course_id/votes body
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option: u32,
}

/// GET /api/courses/:course_id/proposals
pub async fn get_proposals(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Option<Vec<Timetable>>>> {
    Ok(Json(state.voting.proposed_timetables(&course_id).await?))
}

/// PUT /api/courses/:course_id/proposals
pub async fn publish_proposals(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    caller: Caller,
    ApiJson(request): ApiJson<PublishRequest>,
) -> ApiResult<Json<PublishResponse>> {
    let options = state
        .voting
        .publish(&caller, &course_id, request.timetables)
        .await?;
    Ok(Json(PublishResponse { course_id, options }))
}

/// POST /api/courses/:course_id/votes
///
/// Returns the tally as seen by the voter.
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    caller: Caller,
    ApiJson(request): ApiJson<VoteRequest>,
) -> ApiResult<Json<VoteResults>> {
    Ok(Json(
        state.voting.cast_vote(&caller, &course_id, request.option).await?,
    ))
}

/// GET /api/courses/:course_id/results
pub async fn get_results(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    caller: Caller,
) -> ApiResult<Json<VoteResults>> {
    Ok(Json(state.voting.results(&course_id, &caller.user_id).await?))
}

/// POST /api/courses/:course_id/finalize
pub async fn finalize(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    caller: Caller,
) -> ApiResult<Json<FinalTimetable>> {
    Ok(Json(state.voting.finalize(&caller, &course_id).await?))
}

/// GET /api/courses/:course_id/timetable
pub async fn get_final_timetable(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Option<FinalTimetable>>> {
    Ok(Json(state.voting.final_timetable(&course_id).await?))
}

/// GET /api/courses/:course_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<CourseStatus>> {
    Ok(Json(state.voting.status(&course_id).await?))
}
