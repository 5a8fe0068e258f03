//! Read-only catalog endpoints
//!
//! Reference data for building generation requests in a client.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use sams_common::catalog::{Classroom, Course, Subject, TaughtSubject};
use sams_common::users::{Role, User};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SemesterQuery {
    pub semester: Option<u32>,
}

impl SemesterQuery {
    fn require(&self) -> ApiResult<u32> {
        self.semester
            .ok_or_else(|| ApiError::BadRequest("query parameter 'semester' is required".to_string()))
    }
}

/// GET /api/courses
pub async fn list_courses(State(state): State<AppState>) -> Json<Vec<Course>> {
    Json(state.catalog.courses().to_vec())
}

/// GET /api/courses/:course_id/subjects?semester=N
pub async fn list_subjects(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<SemesterQuery>,
) -> ApiResult<Json<Vec<Subject>>> {
    let semester = query.require()?;
    let subjects = state.catalog.subjects_for(&course_id, semester)?;
    Ok(Json(subjects.into_iter().cloned().collect()))
}

/// GET /api/courses/:course_id/faculty?semester=N
pub async fn list_faculty(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<SemesterQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let semester = query.require()?;
    let faculty = state.catalog.faculty_for(&course_id, semester, &state.directory)?;
    Ok(Json(faculty.into_iter().cloned().collect()))
}

/// GET /api/classrooms
pub async fn list_classrooms(State(state): State<AppState>) -> Json<Vec<Classroom>> {
    Json(state.catalog.classrooms().to_vec())
}

/// GET /api/faculty/:faculty_id/subjects
///
/// Subjects assigned to one faculty member across all courses.
pub async fn list_taught_subjects(
    State(state): State<AppState>,
    Path(faculty_id): Path<String>,
) -> ApiResult<Json<Vec<TaughtSubject>>> {
    match state.directory.get(&faculty_id) {
        Some(user) if user.role == Role::Faculty => {}
        _ => return Err(ApiError::NotFound(format!("faculty member '{}'", faculty_id))),
    }
    Ok(Json(state.catalog.subjects_taught_by(&faculty_id)))
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: Option<Role>,
}

/// GET /api/users?role=faculty
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<RoleQuery>,
) -> Json<Vec<User>> {
    let users = match query.role {
        Some(role) => state.directory.by_role(role).cloned().collect(),
        None => state.directory.all().to_vec(),
    };
    Json(users)
}
