//! sams-tt library - Timetable proposal, voting and finalization service
//!
//! Faculty publish candidate weekly timetables for a course (optionally
//! produced by an external schedule generator), students vote, and voting
//! closes by committing the most-voted candidate as the course's final
//! timetable.

use axum::Router;
use chrono::{DateTime, Utc};
use sams_common::catalog::Catalog;
use sams_common::events::EventBus;
use sams_common::users::UserDirectory;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod store;
pub mod voting;

use voting::TimetableVoting;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Timetable workflow (owns the course store)
    pub voting: Arc<TimetableVoting>,
    pub catalog: Arc<Catalog>,
    /// Resolves the `X-User-Id` header to a caller
    pub directory: Arc<UserDirectory>,
    /// Event bus feeding `/events`
    pub event_bus: EventBus,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        voting: Arc<TimetableVoting>,
        catalog: Arc<Catalog>,
        directory: Arc<UserDirectory>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            voting,
            catalog,
            directory,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let courses = Router::new()
        .route("/api/courses", get(api::list_courses))
        .route("/api/courses/:course_id/subjects", get(api::list_subjects))
        .route("/api/courses/:course_id/faculty", get(api::list_faculty))
        .route("/api/classrooms", get(api::list_classrooms))
        .route("/api/faculty/:faculty_id/subjects", get(api::list_taught_subjects))
        .route("/api/users", get(api::list_users));

    let timetables = Router::new()
        .route(
            "/api/courses/:course_id/timetables/generate",
            post(api::generate_timetables),
        )
        .route(
            "/api/courses/:course_id/proposals",
            get(api::get_proposals).put(api::publish_proposals),
        )
        .route("/api/courses/:course_id/votes", post(api::cast_vote))
        .route("/api/courses/:course_id/results", get(api::get_results))
        .route("/api/courses/:course_id/finalize", post(api::finalize))
        .route("/api/courses/:course_id/timetable", get(api::get_final_timetable))
        .route("/api/courses/:course_id/status", get(api::get_status));

    Router::new()
        .merge(courses)
        .merge(timetables)
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
