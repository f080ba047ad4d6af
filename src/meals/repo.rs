use anyhow::Context;
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ai::NutrientTotals;

#[derive(Debug, Clone, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: String,
    pub meal_name: String,
    pub foods: Json<Vec<Value>>,
    pub totals: Json<NutrientTotals>,
    pub photo_key: Option<String>,
    pub created_at: OffsetDateTime,
}

const MEAL_COLUMNS: &str = "id, user_id, meal_name, foods, totals, photo_key, created_at";

pub async fn insert(
    db: &PgPool,
    user_id: &str,
    meal_name: &str,
    foods: &[Value],
    totals: &NutrientTotals,
) -> anyhow::Result<Meal> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        INSERT INTO meals (id, user_id, meal_name, foods, totals)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(meal_name)
    .bind(Json(foods))
    .bind(Json(totals))
    .fetch_one(db)
    .await
    .context("insert meal")?;
    Ok(meal)
}

pub async fn list_by_user(
    db: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list meals by user")?;
    Ok(rows)
}

pub async fn find(db: &PgPool, user_id: &str, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE id = $1 AND user_id = $2
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find meal")?;
    Ok(meal)
}

pub async fn rename(
    db: &PgPool,
    user_id: &str,
    meal_id: Uuid,
    meal_name: &str,
) -> anyhow::Result<Option<Meal>> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        UPDATE meals
           SET meal_name = $3
         WHERE id = $1 AND user_id = $2
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .bind(meal_name)
    .fetch_optional(db)
    .await
    .context("rename meal")?;
    Ok(meal)
}

/// Delete a meal. `None` when it did not exist; otherwise its photo key, if any.
pub async fn delete(
    db: &PgPool,
    user_id: &str,
    meal_id: Uuid,
) -> anyhow::Result<Option<Option<String>>> {
    let row = sqlx::query_as::<_, (Option<String>,)>(
        r#"
        DELETE FROM meals
         WHERE id = $1 AND user_id = $2
        RETURNING photo_key
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("delete meal")?;
    Ok(row.map(|(key,)| key))
}

/// Point a meal at a new photo. `None` when the meal does not exist; otherwise the
/// key it pointed at before.
pub async fn replace_photo_key(
    db: &PgPool,
    user_id: &str,
    meal_id: Uuid,
    photo_key: &str,
) -> anyhow::Result<Option<Option<String>>> {
    let row = sqlx::query_as::<_, (Option<String>,)>(
        r#"
        UPDATE meals m
           SET photo_key = $3
          FROM (SELECT id, photo_key FROM meals WHERE id = $1 AND user_id = $2 FOR UPDATE) old
         WHERE m.id = old.id
        RETURNING old.photo_key
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .bind(photo_key)
    .fetch_optional(db)
    .await
    .context("replace meal photo key")?;
    Ok(row.map(|(key,)| key))
}
