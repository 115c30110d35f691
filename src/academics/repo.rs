use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    crud::{exists, Resource},
    dto::{
        CoursePayload, FeePayload, InstitutionPayload, NoFilter, ProgramFilter, ProgramPayload,
        ProgramScopedFilter, UnitFilter, UnitPayload,
    },
    repo_types::{Course, Fee, Institution, NewCourse, NewFee, NewInstitution, NewProgram, NewUnit, Program, Unit},
};
use crate::validation::{invalid_pk, ValidationErrors};

/// An "Invalid pk" error on `field` when `table` has no row `id`.
async fn require_row(db: &PgPool, field: &str, table: &'static str, id: i64) -> Result<ValidationErrors, sqlx::Error> {
    if exists(db, table, id).await? {
        Ok(ValidationErrors::new())
    } else {
        Ok(ValidationErrors::single(field, invalid_pk(id)))
    }
}

async fn delete_from(db: &PgPool, table: &'static str, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

const INSTITUTION_COLUMNS: &str = "id, name, code, website";

#[async_trait]
impl Resource for Institution {
    type Payload = InstitutionPayload;
    type Valid = NewInstitution;
    type Filter = NoFilter;

    const NAME: &'static str = "institution";

    fn id(&self) -> i64 {
        self.id
    }

    async fn list(db: &PgPool, _filter: &NoFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Institution>(&format!(
            "SELECT {INSTITUTION_COLUMNS} FROM institutions ORDER BY id"
        ))
        .fetch_all(db)
        .await
    }

    async fn find(db: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Institution>(&format!(
            "SELECT {INSTITUTION_COLUMNS} FROM institutions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    async fn insert(db: &PgPool, valid: &NewInstitution) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Institution>(&format!(
            "INSERT INTO institutions (name, code, website) VALUES ($1, $2, $3) RETURNING {INSTITUTION_COLUMNS}"
        ))
        .bind(&valid.name)
        .bind(&valid.code)
        .bind(&valid.website)
        .fetch_one(db)
        .await
    }

    async fn update(db: &PgPool, id: i64, valid: &NewInstitution) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Institution>(&format!(
            r#"
            UPDATE institutions SET name = $2, code = $3, website = $4
            WHERE id = $1
            RETURNING {INSTITUTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&valid.name)
        .bind(&valid.code)
        .bind(&valid.website)
        .fetch_optional(db)
        .await
    }

    async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        delete_from(db, "institutions", id).await
    }

    fn merge(self, patch: InstitutionPayload) -> InstitutionPayload {
        InstitutionPayload {
            name: patch.name.or(Some(self.name)),
            code: patch.code.or(Some(self.code)),
            website: patch.website.or(Some(self.website)),
        }
    }
}

const PROGRAM_COLUMNS: &str = "id, institution_id AS institution, name, duration_years";

#[async_trait]
impl Resource for Program {
    type Payload = ProgramPayload;
    type Valid = NewProgram;
    type Filter = ProgramFilter;

    const NAME: &'static str = "program";

    fn id(&self) -> i64 {
        self.id
    }

    async fn list(db: &PgPool, filter: &ProgramFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Program>(&format!(
            r#"
            SELECT {PROGRAM_COLUMNS} FROM programs
            WHERE ($1::BIGINT IS NULL OR institution_id = $1)
            ORDER BY id
            "#
        ))
        .bind(filter.institution)
        .fetch_all(db)
        .await
    }

    async fn find(db: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Program>(&format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    async fn insert(db: &PgPool, valid: &NewProgram) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Program>(&format!(
            r#"
            INSERT INTO programs (institution_id, name, duration_years)
            VALUES ($1, $2, $3)
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(valid.institution)
        .bind(&valid.name)
        .bind(valid.duration_years)
        .fetch_one(db)
        .await
    }

    async fn update(db: &PgPool, id: i64, valid: &NewProgram) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Program>(&format!(
            r#"
            UPDATE programs SET institution_id = $2, name = $3, duration_years = $4
            WHERE id = $1
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(valid.institution)
        .bind(&valid.name)
        .bind(valid.duration_years)
        .fetch_optional(db)
        .await
    }

    async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        delete_from(db, "programs", id).await
    }

    async fn check_references(db: &PgPool, valid: &NewProgram) -> Result<ValidationErrors, sqlx::Error> {
        require_row(db, "institution", "institutions", valid.institution).await
    }

    fn merge(self, patch: ProgramPayload) -> ProgramPayload {
        ProgramPayload {
            institution: patch.institution.or(Some(self.institution)),
            name: patch.name.or(Some(self.name)),
            duration_years: patch.duration_years.or(Some(self.duration_years.into())),
        }
    }
}

const COURSE_COLUMNS: &str = "id, program_id AS program, title, semester";

#[async_trait]
impl Resource for Course {
    type Payload = CoursePayload;
    type Valid = NewCourse;
    type Filter = ProgramScopedFilter;

    const NAME: &'static str = "course";

    fn id(&self) -> i64 {
        self.id
    }

    async fn list(db: &PgPool, filter: &ProgramScopedFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            SELECT {COURSE_COLUMNS} FROM courses
            WHERE ($1::BIGINT IS NULL OR program_id = $1)
            ORDER BY id
            "#
        ))
        .bind(filter.program)
        .fetch_all(db)
        .await
    }

    async fn find(db: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    async fn insert(db: &PgPool, valid: &NewCourse) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (program_id, title, semester)
            VALUES ($1, $2, $3)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(valid.program)
        .bind(&valid.title)
        .bind(valid.semester)
        .fetch_one(db)
        .await
    }

    async fn update(db: &PgPool, id: i64, valid: &NewCourse) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses SET program_id = $2, title = $3, semester = $4
            WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(valid.program)
        .bind(&valid.title)
        .bind(valid.semester)
        .fetch_optional(db)
        .await
    }

    async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        delete_from(db, "courses", id).await
    }

    async fn check_references(db: &PgPool, valid: &NewCourse) -> Result<ValidationErrors, sqlx::Error> {
        require_row(db, "program", "programs", valid.program).await
    }

    fn merge(self, patch: CoursePayload) -> CoursePayload {
        CoursePayload {
            program: patch.program.or(Some(self.program)),
            title: patch.title.or(Some(self.title)),
            semester: patch.semester.or(Some(self.semester.into())),
        }
    }
}

const UNIT_COLUMNS: &str = "id, course_id AS course, code, name, description";

#[async_trait]
impl Resource for Unit {
    type Payload = UnitPayload;
    type Valid = NewUnit;
    type Filter = UnitFilter;

    const NAME: &'static str = "unit";

    fn id(&self) -> i64 {
        self.id
    }

    async fn list(db: &PgPool, filter: &UnitFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            r#"
            SELECT {UNIT_COLUMNS} FROM units
            WHERE ($1::BIGINT IS NULL OR course_id = $1)
            ORDER BY id
            "#
        ))
        .bind(filter.course)
        .fetch_all(db)
        .await
    }

    async fn find(db: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    async fn insert(db: &PgPool, valid: &NewUnit) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            r#"
            INSERT INTO units (course_id, code, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {UNIT_COLUMNS}
            "#
        ))
        .bind(valid.course)
        .bind(&valid.code)
        .bind(&valid.name)
        .bind(&valid.description)
        .fetch_one(db)
        .await
    }

    async fn update(db: &PgPool, id: i64, valid: &NewUnit) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            r#"
            UPDATE units SET course_id = $2, code = $3, name = $4, description = $5
            WHERE id = $1
            RETURNING {UNIT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(valid.course)
        .bind(&valid.code)
        .bind(&valid.name)
        .bind(&valid.description)
        .fetch_optional(db)
        .await
    }

    async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        delete_from(db, "units", id).await
    }

    async fn check_references(db: &PgPool, valid: &NewUnit) -> Result<ValidationErrors, sqlx::Error> {
        require_row(db, "course", "courses", valid.course).await
    }

    fn merge(self, patch: UnitPayload) -> UnitPayload {
        UnitPayload {
            course: patch.course.or(Some(self.course)),
            code: patch.code.or(Some(self.code)),
            name: patch.name.or(Some(self.name)),
            description: patch.description.or(Some(self.description)),
        }
    }
}

const FEE_COLUMNS: &str = "id, program_id AS program, amount, currency, fee_type, description";

#[async_trait]
impl Resource for Fee {
    type Payload = FeePayload;
    type Valid = NewFee;
    type Filter = ProgramScopedFilter;

    const NAME: &'static str = "fee";

    fn id(&self) -> i64 {
        self.id
    }

    async fn list(db: &PgPool, filter: &ProgramScopedFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Fee>(&format!(
            r#"
            SELECT {FEE_COLUMNS} FROM fees
            WHERE ($1::BIGINT IS NULL OR program_id = $1)
            ORDER BY id
            "#
        ))
        .bind(filter.program)
        .fetch_all(db)
        .await
    }

    async fn find(db: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Fee>(&format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    async fn insert(db: &PgPool, valid: &NewFee) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Fee>(&format!(
            r#"
            INSERT INTO fees (program_id, amount, currency, fee_type, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FEE_COLUMNS}
            "#
        ))
        .bind(valid.program)
        .bind(valid.amount)
        .bind(&valid.currency)
        .bind(&valid.fee_type)
        .bind(&valid.description)
        .fetch_one(db)
        .await
    }

    async fn update(db: &PgPool, id: i64, valid: &NewFee) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Fee>(&format!(
            r#"
            UPDATE fees SET program_id = $2, amount = $3, currency = $4, fee_type = $5, description = $6
            WHERE id = $1
            RETURNING {FEE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(valid.program)
        .bind(valid.amount)
        .bind(&valid.currency)
        .bind(&valid.fee_type)
        .bind(&valid.description)
        .fetch_optional(db)
        .await
    }

    async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        delete_from(db, "fees", id).await
    }

    async fn check_references(db: &PgPool, valid: &NewFee) -> Result<ValidationErrors, sqlx::Error> {
        require_row(db, "program", "programs", valid.program).await
    }

    fn merge(self, patch: FeePayload) -> FeePayload {
        FeePayload {
            program: patch.program.or(Some(self.program)),
            amount: patch.amount.or(Some(self.amount)),
            currency: patch.currency.or(Some(self.currency)),
            fee_type: patch.fee_type.or(Some(self.fee_type)),
            description: patch.description.or(Some(self.description)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn patch_keeps_stored_values_for_absent_fields() {
        let stored = Institution {
            id: 1,
            name: "University of Nairobi".into(),
            code: "UON".into(),
            website: Some("https://uonbi.ac.ke".into()),
        };
        let merged = stored.merge(InstitutionPayload {
            name: Some("UoN".into()),
            ..Default::default()
        });
        assert_eq!(merged.name.as_deref(), Some("UoN"));
        assert_eq!(merged.code.as_deref(), Some("UON"));
        assert_eq!(merged.website, Some(Some("https://uonbi.ac.ke".into())));
    }

    #[test]
    fn patch_with_explicit_null_clears_optional_field() {
        let stored = Fee {
            id: 4,
            program: 2,
            amount: Decimal::from_str("45000.00").unwrap(),
            currency: "KSH".into(),
            fee_type: "Tuition".into(),
            description: Some("per semester".into()),
        };
        let merged = stored.merge(FeePayload {
            description: Some(None),
            ..Default::default()
        });
        assert_eq!(merged.description, Some(None));
        assert_eq!(merged.program, Some(2));
    }

    #[test]
    fn merged_program_still_validates_duration() {
        use crate::validation::Validate;

        let stored = Program {
            id: 3,
            institution: 1,
            name: "BSc Computer Science".into(),
            duration_years: 4,
        };
        let errors = stored
            .merge(ProgramPayload {
                duration_years: Some(0),
                ..Default::default()
            })
            .validate()
            .unwrap_err();
        assert!(errors.contains("duration_years"));
    }
}
