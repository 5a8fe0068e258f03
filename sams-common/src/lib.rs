//! # SAMS Common Library
//!
//! Shared code for the SAMS (Smart Academic Management System) services:
//! - Course catalog (courses, subjects, classrooms)
//! - User directory and role capabilities
//! - Event types (SamsEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - Database initialization

pub mod catalog;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod users;

pub use error::{Error, Result};
