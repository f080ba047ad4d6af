use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateMealRequest, MealDetails, MealListItem, Pagination, PhotoResponse, RenameMealRequest,
};
use super::{repo, services};
use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/meals", get(list_meals))
        .route("/api/meals/:id", get(get_meal))
        .route("/api/meals/:id/photo", get(get_photo))
}

pub fn write_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/api/meals", post(create_meal))
        .route("/api/meals/:id", axum::routing::put(rename_meal).delete(delete_meal))
        .route(
            "/api/meals/:id/photo",
            post(upload_photo).layer(DefaultBodyLimit::max(body_limit)),
        )
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MealListItem>>, ApiError> {
    let (limit, offset) = p.clamped();
    let meals = repo::list_by_user(&state.db, &user_id, limit, offset).await?;
    Ok(Json(meals.into_iter().map(MealListItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealDetails>, ApiError> {
    match repo::find(&state.db, &user_id, id).await? {
        Some(meal) => Ok(Json(meal.into())),
        None => Err(ApiError::NotFound("Meal not found")),
    }
}

/// POST /api/meals { mealName?, foods, totals? }
#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CreateMealRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<MealDetails>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Value::Array(foods) = body.foods else {
        return Err(ApiError::BadRequest("Foods array is required".into()));
    };

    let meal = services::create_meal(&state, &user_id, body.meal_name, foods, body.totals).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/meals/{}", meal.id))
        .map_err(|e| ApiError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(meal.into())))
}

/// PUT /api/meals/:id { mealName }
#[instrument(skip(state, body))]
pub async fn rename_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    body: Result<Json<RenameMealRequest>, JsonRejection>,
) -> Result<Json<MealDetails>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let name = body.meal_name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("mealName must not be blank".into()));
    }

    match repo::rename(&state.db, &user_id, id, name).await? {
        Some(meal) => Ok(Json(meal.into())),
        None => Err(ApiError::NotFound("Meal not found")),
    }
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if services::delete_meal(&state, &user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Meal not found"))
    }
}

/// POST /api/meals/:id/photo (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let max_bytes = state.config.max_upload_bytes;
    let mut mp = mp.map_err(|_| ApiError::BadRequest("Error parsing form data".into()))?;

    let (body, content_type) = loop {
        let field = mp
            .next_field()
            .await
            .map_err(|e| ApiError::multipart(e, max_bytes))?;
        match field {
            Some(field) if field.name() == Some("image") => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                if !content_type.starts_with("image/") {
                    return Err(ApiError::BadRequest(format!(
                        "Unsupported content type {content_type}"
                    )));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::multipart(e, max_bytes))?;
                break (data, content_type);
            }
            Some(_) => continue,
            None => return Err(ApiError::BadRequest("No image uploaded".into())),
        }
    };
    if body.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(max_bytes));
    }

    match services::attach_photo(&state, &user_id, id, body, &content_type).await? {
        Some(photo_key) => Ok(Json(PhotoResponse { photo_key })),
        None => Err(ApiError::NotFound("Meal not found")),
    }
}

/// 302 → presigned url of the meal photo
#[instrument(skip(state))]
pub async fn get_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let meal = repo::find(&state.db, &user_id, id)
        .await?
        .ok_or(ApiError::NotFound("Meal not found"))?;
    let key = meal.photo_key.ok_or(ApiError::NotFound("Photo not found"))?;

    let url = services::presign_photo(&state, &key).await?;
    Ok(Redirect::temporary(&url).into_response())
}
