use serde::{Deserialize, Serialize};

use super::repo_types::{CareerAssessment, CareerRecommendation, NewAssessment};
use crate::validation::{Validate, ValidationErrors};

/// Free-text fields carry no length cap.
const UNBOUNDED: usize = usize::MAX;

#[derive(Debug, Default, Deserialize)]
pub struct AssessmentRequest {
    pub interests: Option<String>,
    pub skills: Option<String>,
    pub academic_strengths: Option<String>,
}

impl Validate for AssessmentRequest {
    type Valid = NewAssessment;

    fn validate(self) -> Result<NewAssessment, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let interests = errors.text("interests", self.interests, UNBOUNDED);
        let skills = errors.text("skills", self.skills, UNBOUNDED);
        let academic_strengths = errors.text("academic_strengths", self.academic_strengths, UNBOUNDED);
        errors.into_result()?;
        Ok(NewAssessment {
            interests,
            skills,
            academic_strengths,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub assessment: CareerAssessment,
    pub recommendation: CareerRecommendation,
    /// False when the stored text is the fallback.
    pub recommendation_generated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_three_fields_are_required() {
        let errors = AssessmentRequest {
            interests: Some("math".into()),
            skills: Some("   ".into()),
            academic_strengths: None,
        }
        .validate()
        .unwrap_err();
        assert!(!errors.contains("interests"));
        assert_eq!(errors.messages("skills"), ["This field may not be blank."]);
        assert_eq!(errors.messages("academic_strengths"), ["This field is required."]);
    }

    #[test]
    fn fields_are_kept_verbatim() {
        let valid = AssessmentRequest {
            interests: Some("math,science".into()),
            skills: Some("python,java".into()),
            academic_strengths: Some("algebra,geometry".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(valid.interests, "math,science");
        assert_eq!(valid.skills, "python,java");
        assert_eq!(valid.academic_strengths, "algebra,geometry");
    }
}
