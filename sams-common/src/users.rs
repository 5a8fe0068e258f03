//! User directory and role capabilities
//!
//! The directory is read-only reference data. Services use it to resolve the
//! caller of a request and to decide which timetable actions the caller's role
//! may perform.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Faculty => write!(f, "faculty"),
            Role::Student => write!(f, "student"),
        }
    }
}

/// Timetable workflow actions subject to role checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GenerateTimetables,
    PublishProposals,
    CastVote,
    FinalizeTimetable,
}

impl Role {
    /// Whether this role may perform `action` at all
    ///
    /// Course membership (students voting only on their own course) is
    /// checked by the caller, which knows the course in question.
    pub fn permits(self, action: Action) -> bool {
        match action {
            Action::GenerateTimetables | Action::PublishProposals | Action::FinalizeTimetable => {
                matches!(self, Role::Admin | Role::Faculty)
            }
            Action::CastVote => self == Role::Student,
        }
    }
}

/// A directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Enrolled course (students only)
    pub course_id: Option<String>,
}

impl User {
    pub fn new(id: &str, name: &str, email: &str, role: Role, course_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            course_id: course_id.map(str::to_string),
        }
    }
}

/// Read-only user lookup
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
    index: HashMap<String, usize>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        let index = users
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id.clone(), i))
            .collect();
        Self { users, index }
    }

    /// Demo directory matching the seeded catalog
    pub fn seeded() -> Self {
        Self::new(vec![
            User::new("1", "Admin User", "admin@sams.com", Role::Admin, None),
            User::new("2", "Dr. Jane Doe", "jane.doe@sams.com", Role::Faculty, None),
            User::new("10", "Prof. Robert Davis", "robert.davis@sams.com", Role::Faculty, None),
            User::new("11", "Dr. Emily Wilson", "emily.wilson@sams.com", Role::Faculty, None),
            User::new("3", "John Smith", "john.smith@sams.com", Role::Student, Some("CS101")),
            User::new("4", "Alice Johnson", "alice.j@sams.com", Role::Student, Some("CS101")),
            User::new("5", "Michael Brown", "michael.b@sams.com", Role::Student, Some("EE201")),
            User::new("6", "Sarah Miller", "sarah.m@sams.com", Role::Student, Some("EE201")),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.index.get(id).map(|&i| &self.users[i])
    }

    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn by_role(&self, role: Role) -> impl Iterator<Item = &User> {
        self.users.iter().filter(move |u| u.role == role)
    }
}
