use serde::Deserialize;

use super::repo_types::{ExamRegistration, NewExamRegistration};
use crate::validation::{Validate, ValidationErrors};

/// Body for create/replace/patch. `student`, `registered_on` and
/// `is_verified` are not read from clients, so they are simply not fields here.
#[derive(Debug, Default, Deserialize)]
pub struct ExamRegistrationPayload {
    pub course_code: Option<String>,
    pub course_title: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i64>,
}

impl ExamRegistrationPayload {
    /// Fills fields a PATCH left out from the stored row.
    pub fn merged_over(self, row: ExamRegistration) -> Self {
        Self {
            course_code: self.course_code.or(Some(row.course_code)),
            course_title: self.course_title.or(Some(row.course_title)),
            semester: self.semester.or(Some(row.semester)),
            year: self.year.or(Some(row.year.into())),
        }
    }
}

impl Validate for ExamRegistrationPayload {
    type Valid = NewExamRegistration;

    fn validate(self) -> Result<NewExamRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let course_code = errors.text("course_code", self.course_code.map(|c| c.trim().to_string()), 20);
        let course_title = errors.text("course_title", self.course_title, 100);
        let semester = errors.text("semester", self.semester, 20);
        let year = errors.positive("year", self.year);
        errors.into_result()?;
        Ok(NewExamRegistration {
            course_code,
            course_title,
            semester,
            year,
        })
    }
}
