//! Generator constraints from catalog selections

use sams_common::catalog::{Catalog, DEFAULT_TIME_SLOTS};
use sams_common::users::{Role, UserDirectory};
use sams_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::models::TimetableConstraints;

/// What a scheduler picked for one generation request
///
/// Every list is optional; `None` means "everything the catalog offers for
/// this course semester" (or the default time slots).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSelection {
    pub semester: u32,
    #[serde(default)]
    pub subjects: Option<Vec<String>>,
    #[serde(default)]
    pub faculties: Option<Vec<String>>,
    #[serde(default)]
    pub classrooms: Option<Vec<String>>,
    #[serde(default)]
    pub time_slots: Option<Vec<String>>,
}

impl ConstraintSelection {
    pub fn for_semester(semester: u32) -> Self {
        Self {
            semester,
            ..Self::default()
        }
    }
}

/// Narrow `offered` to `selected`, rejecting names the catalog does not know
fn pick(kind: &str, offered: Vec<String>, selected: Option<&Vec<String>>) -> Result<Vec<String>> {
    let chosen = match selected {
        None => offered,
        Some(selected) => {
            if let Some(unknown) = selected.iter().find(|name| !offered.contains(name)) {
                return Err(Error::InvalidInput(format!("unknown {} '{}'", kind, unknown)));
            }
            let mut chosen: Vec<String> = Vec::with_capacity(selected.len());
            for name in selected {
                if !chosen.contains(name) {
                    chosen.push(name.clone());
                }
            }
            chosen
        }
    };

    if chosen.is_empty() {
        return Err(Error::InvalidInput(format!("no {} available for scheduling", kind)));
    }
    Ok(chosen)
}

/// Build generator input for one course semester
pub fn build_constraints(
    catalog: &Catalog,
    directory: &UserDirectory,
    course_id: &str,
    selection: &ConstraintSelection,
) -> Result<TimetableConstraints> {
    let course = catalog.require_course(course_id)?;

    let subjects = catalog
        .subjects_for(course_id, selection.semester)?
        .into_iter()
        .map(|s| s.name.clone())
        .collect();

    // Any faculty member may be assigned; the default is those already teaching this semester
    let faculties = match &selection.faculties {
        None => catalog
            .faculty_for(course_id, selection.semester, directory)?
            .into_iter()
            .map(|u| u.name.clone())
            .collect(),
        Some(_) => directory.by_role(Role::Faculty).map(|u| u.name.clone()).collect(),
    };

    let classrooms = catalog.classrooms().iter().map(|c| c.name.clone()).collect();

    let time_slots = match &selection.time_slots {
        None => DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
        Some(slots) => {
            if slots.iter().any(|s| s.trim().is_empty()) {
                return Err(Error::InvalidInput("time slots must not be blank".to_string()));
            }
            slots.clone()
        }
    };

    Ok(TimetableConstraints {
        course_name: course.name.clone(),
        semester: selection.semester,
        subjects: pick("subject", subjects, selection.subjects.as_ref())?,
        faculties: pick("faculty", faculties, selection.faculties.as_ref())?,
        classrooms: pick("classroom", classrooms, selection.classrooms.as_ref())?,
        time_slots: pick("time slot", time_slots, None)?,
    })
}
