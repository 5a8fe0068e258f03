//! Database initialization and schema

pub mod init;

pub use init::{create_timetable_tables, init_database};
