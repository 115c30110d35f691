use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Institution {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Program {
    pub id: i64,
    pub institution: i64,
    pub name: String,
    pub duration_years: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Course {
    pub id: i64,
    pub program: i64,
    pub title: String,
    pub semester: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Unit {
    pub id: i64,
    pub course: i64,
    pub code: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Fee {
    pub id: i64,
    pub program: i64,
    pub amount: Decimal,
    pub currency: String,
    pub fee_type: String,
    pub description: Option<String>,
}

// Validated write models.

#[derive(Debug, Clone, PartialEq)]
pub struct NewInstitution {
    pub name: String,
    pub code: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProgram {
    pub institution: i64,
    pub name: String,
    pub duration_years: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub program: i64,
    pub title: String,
    pub semester: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUnit {
    pub course: i64,
    pub code: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFee {
    pub program: i64,
    pub amount: Decimal,
    pub currency: String,
    pub fee_type: String,
    pub description: Option<String>,
}
