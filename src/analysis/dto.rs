use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{foods: [...]}` as posted by the dashboard. Kept loose so shape errors become 400s.
#[derive(Debug, Deserialize)]
pub struct FoodsRequest {
    #[serde(default)]
    pub foods: Value,
}

#[derive(Debug, Serialize)]
pub struct FoodsResponse {
    pub foods: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealNameResponse {
    pub meal_name: String,
}
