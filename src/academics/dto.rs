use rust_decimal::Decimal;
use serde::Deserialize;

use super::repo_types::{NewCourse, NewFee, NewInstitution, NewProgram, NewUnit};
use crate::validation::{nullable, Validate, ValidationErrors};

pub const DEFAULT_CURRENCY: &str = "KSH";

// Request bodies for create (POST), replace (PUT) and partial update (PATCH).
// Every field is optional at the serde layer so missing fields come back as
// field errors instead of a body rejection.

#[derive(Debug, Default, Deserialize)]
pub struct InstitutionPayload {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgramPayload {
    pub institution: Option<i64>,
    pub name: Option<String>,
    pub duration_years: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoursePayload {
    pub program: Option<i64>,
    pub title: Option<String>,
    pub semester: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnitPayload {
    pub course: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeePayload {
    pub program: Option<i64>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub fee_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

/// `?institution=ID` on `/programs`.
#[derive(Debug, Default, Deserialize)]
pub struct ProgramFilter {
    pub institution: Option<i64>,
}

/// `?program=ID` on `/courses` and `/fees`.
#[derive(Debug, Default, Deserialize)]
pub struct ProgramScopedFilter {
    pub program: Option<i64>,
}

/// `?course=ID` on `/units`.
#[derive(Debug, Default, Deserialize)]
pub struct UnitFilter {
    pub course: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoFilter {}

impl Validate for InstitutionPayload {
    type Valid = NewInstitution;

    fn validate(self) -> Result<NewInstitution, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.text("name", self.name, 255);
        let code = errors.text("code", self.code.map(|c| c.trim().to_string()), 20);
        let website = errors.optional_url("website", self.website.flatten(), 200);
        errors.into_result()?;
        Ok(NewInstitution { name, code, website })
    }
}

impl Validate for ProgramPayload {
    type Valid = NewProgram;

    fn validate(self) -> Result<NewProgram, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let institution = errors.reference("institution", self.institution);
        let name = errors.text("name", self.name, 255);
        let duration_years = errors.positive("duration_years", self.duration_years);
        errors.into_result()?;
        Ok(NewProgram {
            institution,
            name,
            duration_years,
        })
    }
}

impl Validate for CoursePayload {
    type Valid = NewCourse;

    fn validate(self) -> Result<NewCourse, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let program = errors.reference("program", self.program);
        let title = errors.text("title", self.title, 255);
        let semester = errors.positive("semester", self.semester);
        errors.into_result()?;
        Ok(NewCourse {
            program,
            title,
            semester,
        })
    }
}

impl Validate for UnitPayload {
    type Valid = NewUnit;

    fn validate(self) -> Result<NewUnit, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let course = errors.reference("course", self.course);
        let code = errors.text("code", self.code.map(|c| c.trim().to_string()), 10);
        let name = errors.text("name", self.name, 255);
        let description = self.description.unwrap_or_default();
        errors.into_result()?;
        Ok(NewUnit {
            course,
            code,
            name,
            description,
        })
    }
}

impl Validate for FeePayload {
    type Valid = NewFee;

    fn validate(self) -> Result<NewFee, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let program = errors.reference("program", self.program);
        let amount = errors.decimal("amount", self.amount, 10, 2);
        let currency = match self.currency {
            None => DEFAULT_CURRENCY.to_string(),
            Some(c) => errors.text("currency", Some(c.trim().to_string()), 10),
        };
        let fee_type = errors.text("fee_type", self.fee_type, 50);
        let description = errors.optional_text("description", self.description.flatten(), None);
        errors.into_result()?;
        Ok(NewFee {
            program,
            amount,
            currency,
            fee_type,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn program_duration_must_be_positive() {
        for bad in [0, -3] {
            let errors = ProgramPayload {
                institution: Some(1),
                name: Some("BSc Computer Science".into()),
                duration_years: Some(bad),
            }
            .validate()
            .unwrap_err();
            assert_eq!(errors.messages("duration_years"), ["Ensure this value is greater than 0."]);
        }
    }

    #[test]
    fn program_validates_into_write_model() {
        let valid = ProgramPayload {
            institution: Some(3),
            name: Some("BSc Computer Science".into()),
            duration_years: Some(4),
        }
        .validate()
        .unwrap();
        assert_eq!(
            valid,
            NewProgram {
                institution: 3,
                name: "BSc Computer Science".into(),
                duration_years: 4
            }
        );
    }

    #[test]
    fn institution_requires_name_and_code_and_checks_website() {
        let errors = InstitutionPayload {
            name: None,
            code: Some("C".repeat(21)),
            website: Some(Some("uon".into())),
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("code"));
        assert!(errors.contains("website"));
    }

    #[test]
    fn institution_website_is_optional() {
        let payload: InstitutionPayload =
            serde_json::from_str(r#"{"name":"University of Nairobi","code":"UON","website":null}"#).unwrap();
        let valid = payload.validate().unwrap();
        assert_eq!(valid.website, None);
        assert_eq!(valid.code, "UON");
    }

    #[test]
    fn course_semester_must_be_positive_and_program_required() {
        let errors = CoursePayload {
            program: None,
            title: Some("Data Structures".into()),
            semester: Some(0),
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("program"));
        assert!(errors.contains("semester"));
    }

    #[test]
    fn unit_description_may_be_blank() {
        let valid = UnitPayload {
            course: Some(1),
            code: Some("CS101".into()),
            name: Some("Intro".into()),
            description: None,
        }
        .validate()
        .unwrap();
        assert_eq!(valid.description, "");

        let errors = UnitPayload {
            course: Some(1),
            code: Some("TOO-LONG-CODE".into()),
            name: Some("Intro".into()),
            description: None,
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("code"));
    }

    #[test]
    fn fee_defaults_currency_and_checks_amount_shape() {
        let payload: FeePayload =
            serde_json::from_str(r#"{"program":2,"amount":"45000.50","fee_type":"Tuition"}"#).unwrap();
        let valid = payload.validate().unwrap();
        assert_eq!(valid.currency, DEFAULT_CURRENCY);
        assert_eq!(valid.amount, Decimal::from_str("45000.50").unwrap());
        assert_eq!(valid.description, None);

        let errors = FeePayload {
            program: Some(2),
            amount: Some(Decimal::from_str("10.555").unwrap()),
            currency: Some("".into()),
            fee_type: None,
            description: None,
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("amount"));
        assert!(errors.contains("currency"));
        assert!(errors.contains("fee_type"));
    }
}
