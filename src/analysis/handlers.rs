use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{error, instrument, warn};

use super::dto::{FoodsRequest, FoodsResponse, MealNameResponse};
use super::services;
use super::spool::SpooledUpload;
use crate::{
    error::{method_not_allowed, ApiError},
    state::AppState,
};

/// `body_limit` caps the raw request body of the upload route.
pub fn routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/upload-image",
            post(upload_image)
                .options(preflight)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/openai-nutrient-sheet",
            post(nutrient_sheet)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/generate-meal-name",
            post(meal_name).options(preflight).fallback(method_not_allowed),
        )
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// POST /api/upload-image (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<FoodsResponse>, ApiError> {
    let mut mp = mp.map_err(|e| {
        warn!(error = %e, "upload without multipart body");
        ApiError::BadRequest("Error parsing form data".into())
    })?;

    let spool = loop {
        let field = mp
            .next_field()
            .await
            .map_err(|e| ApiError::multipart(e, state.config.max_upload_bytes))?;
        match field {
            Some(field) if field.name() == Some("image") => {
                break SpooledUpload::from_field(
                    field,
                    &state.config.upload_dir,
                    state.config.max_upload_bytes,
                )
                .await?;
            }
            Some(_) => continue,
            None => return Err(ApiError::BadRequest("No image uploaded".into())),
        }
    };

    let foods = services::identify_foods(&state, &spool).await.map_err(|e| {
        error!(error = ?e, "identify_foods failed");
        ApiError::Upstream("Failed to analyze image")
    })?;

    Ok(Json(FoodsResponse { foods }))
}

/// POST /api/openai-nutrient-sheet { foods: [{food, grams}] }
#[instrument(skip(state, body))]
pub async fn nutrient_sheet(
    State(state): State<AppState>,
    body: Result<Json<FoodsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let foods = require_foods(body, false)?;

    let totals = services::compute_totals(&state, &foods).await.map_err(|e| {
        error!(error = ?e, "compute_totals failed");
        ApiError::Upstream("Failed to compute nutrient totals")
    })?;

    Ok(Json(totals.into_wrapped()))
}

/// POST /api/generate-meal-name { foods: [{food, grams}] }
#[instrument(skip(state, body))]
pub async fn meal_name(
    State(state): State<AppState>,
    body: Result<Json<FoodsRequest>, JsonRejection>,
) -> Result<Json<MealNameResponse>, ApiError> {
    let foods = require_foods(body, true)?;

    let meal_name = services::generate_meal_name(&state, &foods)
        .await
        .map_err(|e| {
            error!(error = ?e, "generate_meal_name failed");
            ApiError::Upstream("Failed to generate meal name")
        })?;

    Ok(Json(MealNameResponse { meal_name }))
}

fn require_foods(
    body: Result<Json<FoodsRequest>, JsonRejection>,
    allow_empty: bool,
) -> Result<Vec<Value>, ApiError> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::BadRequest("Foods array is required".into())
    })?;
    match body.foods {
        Value::Array(foods) if allow_empty || !foods.is_empty() => Ok(foods),
        _ => Err(ApiError::BadRequest("Foods array is required".into())),
    }
}
