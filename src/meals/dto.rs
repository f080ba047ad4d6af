use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Meal;
use crate::ai::NutrientTotals;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealRequest {
    pub meal_name: Option<String>,
    #[serde(default)]
    pub foods: Value,
    /// Either `{totals: {...}}` as returned by the nutrient sheet or the bare totals.
    #[serde(default)]
    pub totals: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameMealRequest {
    pub meal_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDetails {
    pub id: Uuid,
    pub meal_name: String,
    pub foods: Vec<Value>,
    pub totals: NutrientTotals,
    pub has_photo: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Meal> for MealDetails {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            meal_name: m.meal_name,
            foods: m.foods.0,
            totals: m.totals.0,
            has_photo: m.photo_key.is_some(),
            created_at: m.created_at,
        }
    }
}

/// Dashboard row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealListItem {
    pub id: Uuid,
    pub meal_name: String,
    pub calories: Option<f64>,
    pub food_count: usize,
    pub has_photo: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Meal> for MealListItem {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            calories: m.totals.0.macro_value("calories"),
            food_count: m.foods.0.len(),
            has_photo: m.photo_key.is_some(),
            meal_name: m.meal_name,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub photo_key: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;
    use time::macros::datetime;

    fn meal() -> Meal {
        Meal {
            id: Uuid::nil(),
            user_id: "u1".into(),
            meal_name: "Chicken Rice Bowl".into(),
            foods: Json(vec![
                json!({"food": "chicken breast", "grams": 200}),
                json!({"food": "rice", "grams": 150}),
            ]),
            totals: Json(NutrientTotals {
                macronutrients: json!({"calories": 512.5}).as_object().unwrap().clone(),
                micronutrients: Default::default(),
            }),
            photo_key: Some("meals/u1/x.jpg".into()),
            created_at: datetime!(2025-03-01 12:30 UTC),
        }
    }

    #[test]
    fn details_serialize_camel_case_without_photo_key() {
        let v = serde_json::to_value(MealDetails::from(meal())).unwrap();
        assert_eq!(v["mealName"], "Chicken Rice Bowl");
        assert_eq!(v["hasPhoto"], true);
        assert_eq!(v["createdAt"], "2025-03-01T12:30:00Z");
        assert_eq!(v["totals"]["micronutrients"], json!({}));
        assert!(v.get("photoKey").is_none());
        assert!(v.get("userId").is_none());
    }

    #[test]
    fn list_item_summarizes_calories() {
        let item = MealListItem::from(meal());
        assert_eq!(item.calories, Some(512.5));
        assert_eq!(item.food_count, 2);
    }

    #[test]
    fn pagination_is_clamped() {
        let p: Pagination = serde_json::from_value(json!({})).unwrap();
        assert_eq!(p.clamped(), (20, 0));
        let p = Pagination { limit: 10_000, offset: -5 };
        assert_eq!(p.clamped(), (100, 0));
        let p = Pagination { limit: 0, offset: 40 };
        assert_eq!(p.clamped(), (1, 40));
    }
}
