//! HTTP API handlers for sams-tt

pub mod caller;
pub mod catalog;
pub mod generate;
pub mod health;
pub mod json;
pub mod sse;
pub mod timetable;

pub use catalog::{
    list_classrooms, list_courses, list_faculty, list_subjects, list_taught_subjects, list_users,
};
pub use generate::generate_timetables;
pub use health::health_routes;
pub use json::ApiJson;
pub use sse::event_stream;
pub use timetable::{
    cast_vote, finalize, get_final_timetable, get_proposals, get_results, get_status,
    publish_proposals,
};
