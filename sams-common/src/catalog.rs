//! Course catalog: courses, subjects, classrooms
//!
//! Static reference data supplying the human-readable names used to build
//! schedule generator constraints and to render timetables.

use crate::users::{Role, User, UserDirectory};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Time slots offered to the generator when a request does not narrow them
pub const DEFAULT_TIME_SLOTS: [&str; 6] = [
    "09:00 - 10:00",
    "10:00 - 11:00",
    "11:00 - 12:00",
    "12:00 - 13:00",
    "14:00 - 15:00",
    "15:00 - 16:00",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub semesters: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub course_id: String,
    pub semester: u32,
    pub faculty_ids: Vec<String>,
}

/// Subject taught by a faculty member, with its course's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaughtSubject {
    #[serde(flatten)]
    pub subject: Subject,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: String,
    pub name: String,
}

/// Read-only catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    courses: Vec<Course>,
    subjects: Vec<Subject>,
    classrooms: Vec<Classroom>,
}

fn subject(id: &str, name: &str, course_id: &str, semester: u32, faculty_ids: &[&str]) -> Subject {
    Subject {
        id: id.to_string(),
        name: name.to_string(),
        course_id: course_id.to_string(),
        semester,
        faculty_ids: faculty_ids.iter().map(|s| s.to_string()).collect(),
    }
}

impl Catalog {
    pub fn new(courses: Vec<Course>, subjects: Vec<Subject>, classrooms: Vec<Classroom>) -> Self {
        Self {
            courses,
            subjects,
            classrooms,
        }
    }

    /// Demo catalog (two courses, eight subjects, four rooms)
    pub fn seeded() -> Self {
        let courses = vec![
            Course {
                id: "CS101".to_string(),
                name: "Computer Science".to_string(),
                semesters: 8,
            },
            Course {
                id: "EE201".to_string(),
                name: "Electrical Engineering".to_string(),
                semesters: 8,
            },
        ];

        let subjects = vec![
            subject("CS-S1-1", "Introduction to Programming", "CS101", 1, &["2", "10"]),
            subject("CS-S1-2", "Discrete Mathematics", "CS101", 1, &["10"]),
            subject("CS-S1-3", "Digital Logic Design", "CS101", 1, &["11"]),
            subject("CS-S2-1", "Data Structures", "CS101", 2, &["2"]),
            subject("CS-S2-2", "Algorithms", "CS101", 2, &["10"]),
            subject("EE-S1-1", "Basic Electrical Engineering", "EE201", 1, &["11", "2"]),
            subject("EE-S1-2", "Engineering Physics", "EE201", 1, &["10"]),
            subject("EE-S2-1", "Circuit Theory", "EE201", 2, &["11"]),
        ];

        let classrooms = [
            ("CR1", "Classroom A1"),
            ("CR2", "Classroom B2"),
            ("LAB1", "Computer Lab 1"),
            ("LAB2", "Electronics Lab"),
        ]
        .iter()
        .map(|(id, name)| Classroom {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();

        Self::new(courses, subjects, classrooms)
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    /// Course lookup that fails with `NotFound` for unknown ids
    pub fn require_course(&self, course_id: &str) -> Result<&Course> {
        self.course(course_id)
            .ok_or_else(|| Error::NotFound(format!("course '{}'", course_id)))
    }

    pub fn classrooms(&self) -> &[Classroom] {
        &self.classrooms
    }

    /// Subjects of one course semester
    pub fn subjects_for(&self, course_id: &str, semester: u32) -> Result<Vec<&Subject>> {
        let course = self.require_course(course_id)?;
        if semester == 0 || semester > course.semesters {
            return Err(Error::InvalidInput(format!(
                "semester {} out of range 1..={} for course '{}'",
                semester, course.semesters, course_id
            )));
        }

        Ok(self
            .subjects
            .iter()
            .filter(|s| s.course_id == course_id && s.semester == semester)
            .collect())
    }

    /// Faculty members teaching any subject of one course semester, in directory order
    pub fn faculty_for<'a>(
        &self,
        course_id: &str,
        semester: u32,
        directory: &'a UserDirectory,
    ) -> Result<Vec<&'a User>> {
        let faculty_ids: HashSet<&str> = self
            .subjects_for(course_id, semester)?
            .into_iter()
            .flat_map(|s| s.faculty_ids.iter().map(String::as_str))
            .collect();

        Ok(directory
            .by_role(Role::Faculty)
            .filter(|u| faculty_ids.contains(u.id.as_str()))
            .collect())
    }

    /// Subjects taught by one faculty member across all courses
    pub fn subjects_taught_by(&self, faculty_id: &str) -> Vec<TaughtSubject> {
        self.subjects
            .iter()
            .filter(|s| s.faculty_ids.iter().any(|f| f == faculty_id))
            .map(|s| TaughtSubject {
                subject: s.clone(),
                course_name: self
                    .course(&s.course_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "Unknown Course".to_string()),
            })
            .collect()
    }
}
