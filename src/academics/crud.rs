//! Generic list/create/retrieve/update/partial-update/delete handlers shared
//! by the academic record types.

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::{
    auth::{load_caller, AuthUser},
    error::{AppError, AppJson, AppPath, AppQuery, AppResult},
    state::AppState,
    validation::{Validate, ValidationErrors},
};

/// A persisted record type exposed through the generic CRUD routes.
#[async_trait]
pub trait Resource: Serialize + Send + Sync + Unpin + Sized + 'static {
    /// Request body for POST/PUT/PATCH.
    type Payload: DeserializeOwned + Validate<Valid = Self::Valid> + Send + 'static;
    /// Checked write model.
    type Valid: Send + Sync;
    /// Query-string filter for listing.
    type Filter: DeserializeOwned + Send + Sync + 'static;

    /// Singular name used in messages and logs.
    const NAME: &'static str;

    fn id(&self) -> i64;

    async fn list(db: &PgPool, filter: &Self::Filter) -> Result<Vec<Self>, sqlx::Error>;
    async fn find(db: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error>;
    async fn insert(db: &PgPool, valid: &Self::Valid) -> Result<Self, sqlx::Error>;
    async fn update(db: &PgPool, id: i64, valid: &Self::Valid) -> Result<Option<Self>, sqlx::Error>;
    async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error>;

    /// Field errors for foreign keys in `valid` that point at nothing.
    async fn check_references(_db: &PgPool, _valid: &Self::Valid) -> Result<ValidationErrors, sqlx::Error> {
        Ok(ValidationErrors::new())
    }

    /// Fills every field a PATCH left out with the stored value.
    fn merge(self, patch: Self::Payload) -> Self::Payload;
}

pub fn routes<R: Resource>(collection: &str) -> Router<AppState> {
    Router::new()
        .route(collection, get(list::<R>).post(create::<R>))
        .route(
            &format!("{collection}/:id"),
            get(retrieve::<R>)
                .put(update::<R>)
                .patch(partial_update::<R>)
                .delete(destroy::<R>),
        )
}

fn checked<R: Resource>(payload: R::Payload) -> AppResult<R::Valid> {
    payload.validate().map_err(|errors| {
        warn!(resource = R::NAME, fields = %errors, "validation failed");
        AppError::from(errors)
    })
}

/// Foreign keys in `valid` must point at existing rows.
async fn check_references<R: Resource>(db: &PgPool, valid: &R::Valid) -> AppResult<()> {
    let missing = R::check_references(db, valid).await?;
    if !missing.is_empty() {
        warn!(resource = R::NAME, fields = %missing, "dangling reference");
        return Err(missing.into());
    }
    Ok(())
}

#[instrument(skip_all, fields(resource = R::NAME))]
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(filter): AppQuery<R::Filter>,
) -> AppResult<Json<Vec<R>>> {
    load_caller(&state.db, caller).await?;
    Ok(Json(R::list(&state.db, &filter).await?))
}

#[instrument(skip_all, fields(resource = R::NAME))]
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<R::Payload>,
) -> AppResult<(StatusCode, Json<R>)> {
    let valid = checked::<R>(payload)?;
    let caller = load_caller(&state.db, caller).await?;
    check_references::<R>(&state.db, &valid).await?;
    let row = R::insert(&state.db, &valid).await?;
    info!(resource = R::NAME, id = row.id(), student = caller.id, "created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip_all, fields(resource = R::NAME))]
pub async fn retrieve<R: Resource>(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<R>> {
    load_caller(&state.db, caller).await?;
    R::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(R::NAME))
}

#[instrument(skip_all, fields(resource = R::NAME))]
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<R::Payload>,
) -> AppResult<Json<R>> {
    let caller = load_caller(&state.db, caller).await?;
    if R::find(&state.db, id).await?.is_none() {
        return Err(AppError::not_found(R::NAME));
    }
    let valid = checked::<R>(payload)?;
    check_references::<R>(&state.db, &valid).await?;
    let row = R::update(&state.db, id, &valid)
        .await?
        .ok_or_else(|| AppError::not_found(R::NAME))?;
    info!(resource = R::NAME, id, student = caller.id, "updated");
    Ok(Json(row))
}

#[instrument(skip_all, fields(resource = R::NAME))]
pub async fn partial_update<R: Resource>(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(patch): AppJson<R::Payload>,
) -> AppResult<Json<R>> {
    let caller = load_caller(&state.db, caller).await?;
    let existing = R::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(R::NAME))?;
    let valid = checked::<R>(existing.merge(patch))?;
    check_references::<R>(&state.db, &valid).await?;
    let row = R::update(&state.db, id, &valid)
        .await?
        .ok_or_else(|| AppError::not_found(R::NAME))?;
    info!(resource = R::NAME, id, student = caller.id, "partially updated");
    Ok(Json(row))
}

#[instrument(skip_all, fields(resource = R::NAME))]
pub async fn destroy<R: Resource>(
    State(state): State<AppState>,
    caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    let caller = load_caller(&state.db, caller).await?;
    if !R::delete(&state.db, id).await? {
        return Err(AppError::not_found(R::NAME));
    }
    info!(resource = R::NAME, id, student = caller.id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// True when `table` has a row with primary key `id`.
pub(super) async fn exists(db: &PgPool, table: &'static str, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"))
        .bind(id)
        .fetch_one(db)
        .await
}
