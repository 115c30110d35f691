use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{load_caller, AuthUser},
    career::{
        dto::{AssessmentRequest, AssessmentResponse},
        repo_types::{CareerAssessment, CareerRecommendation},
        services::generate_recommendation,
    },
    error::{AppJson, AppResult},
    state::AppState,
    validation::Validate,
};

pub fn career_routes() -> Router<AppState> {
    Router::new()
        .route("/career/assess", post(assess))
        .route("/career/recommendations", get(list_recommendations))
        .route("/career/assessments", get(list_assessments))
}

/// Stores the assessment and exactly one recommendation for it, generated or fallback.
#[instrument(skip(state, payload))]
pub async fn assess(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(payload): AppJson<AssessmentRequest>,
) -> AppResult<(StatusCode, Json<AssessmentResponse>)> {
    let new = payload.validate().map_err(|errors| {
        warn!(fields = %errors, "assessment rejected");
        errors
    })?;
    let caller = load_caller(&state.db, caller).await?;

    // No pooled connection is held while the model is working.
    let advice = generate_recommendation(state.llm.as_ref(), &state.config.llm.recommendation_model, &new).await;

    let mut tx = state.db.begin().await?;
    let assessment = CareerAssessment::insert(&mut tx, caller.id, &new).await?;
    let recommendation = CareerRecommendation::insert(&mut tx, caller.id, &advice.text).await?;
    tx.commit().await?;

    info!(
        student = caller.id,
        assessment = assessment.id,
        recommendation = recommendation.id,
        generated = advice.generated,
        "career assessment stored"
    );
    Ok((
        StatusCode::CREATED,
        Json(AssessmentResponse {
            assessment,
            recommendation,
            recommendation_generated: advice.generated,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_recommendations(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<Vec<CareerRecommendation>>> {
    let caller = load_caller(&state.db, caller).await?;
    Ok(Json(CareerRecommendation::list_for_student(&state.db, caller.id).await?))
}

#[instrument(skip(state))]
pub async fn list_assessments(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<Vec<CareerAssessment>>> {
    let caller = load_caller(&state.db, caller).await?;
    Ok(Json(CareerAssessment::list_for_student(&state.db, caller.id).await?))
}
