use serde_json::Value;

pub const VISION_MAX_TOKENS: u32 = 500;
pub const NUTRIENT_MAX_TOKENS: u32 = 2000;
pub const MEAL_NAME_MAX_TOKENS: u32 = 20;
pub const MEAL_NAME_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_MEAL_NAME: &str = "Custom Meal";

pub const VISION_SYSTEM_PROMPT: &str = "You are a food recognition expert. Analyze the food in the image and return a JSON array, where each item is an object with the fields: food (the name of the food you see) and grams (your best guess of the amount in grams). Be as specific as possible: list each distinct food item separately (e.g., \"strawberries\", \"blueberries\", etc. instead of \"berries\"). Do not group foods under generic terms. Do not return N/A or unknown; always provide your best guess for both fields, even if you are uncertain.";

pub const VISION_USER_PROMPT: &str =
    "List all foods you see in this image and estimate the amount in grams for each. Return as a JSON array.";

/// Shape and key set the nutrient model must reproduce.
pub const EXAMPLE_TOTALS_JSON: &str = r#"{"totals": {"macronutrients": {"calories": 617, "protein": 11.5, "fats": 24.3, "carbohydrates": 89.2, "fiber": 4.1, "sugar": 28.9}, "micronutrients": {"calcium_mg": 133.5, "iron_mg": 3.6, "magnesium_mg": 53.4, "phosphorus_mg": 162.2, "potassium_mg": 347.8, "sodium_mg": 431.1, "zinc_mg": 1.8, "copper_mg": 0.4, "manganese_mg": 1.5, "selenium_ug": 10.2, "vitamin_a_ug": 135.7, "vitamin_b1_mg": 0.3, "vitamin_b2_mg": 0.3, "vitamin_b3_mg": 3.1, "vitamin_b5_mg": 0.6, "vitamin_b6_mg": 0.2, "vitamin_b12_ug": 0.2, "vitamin_c_mg": 13.1, "vitamin_d_ug": 0, "vitamin_e_mg": 0.6, "vitamin_k_ug": 7.9, "folate_ug": 42.5, "cholesterol_mg": 39.1}}}"#;

const NUTRIENT_INSTRUCTIONS: &str = "provide ONLY the total sum of every macronutrient and every micronutrient contributed by all foods combined. Use the EXACT JSON format and keys below, with the same units and all fields present (even if zero). Do not add or remove any fields. Respond in JSON only, no explanation.";

pub const MEAL_NAME_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates descriptive meal names based on food ingredients.";

pub fn nutrient_system_prompt() -> String {
    format!(
        "You are a nutrition expert. Given a list of foods and their amounts in grams, {} Example format: {}",
        NUTRIENT_INSTRUCTIONS.replacen("provide", "return", 1),
        EXAMPLE_TOTALS_JSON
    )
}

pub fn nutrient_user_prompt(food_list: &str) -> String {
    format!(
        "For the following foods and their amounts in grams, {} Example format: {} Foods: {}",
        NUTRIENT_INSTRUCTIONS, EXAMPLE_TOTALS_JSON, food_list
    )
}

pub fn meal_name_prompt(food_list: &str) -> String {
    format!(
        r#"Given these foods: {food_list}

Please generate a short, descriptive meal name (2-4 words) that captures the essence of this meal. The name should be appetizing and easy to understand.

Examples of good meal names:
- "Grilled Chicken Salad"
- "Pasta Carbonara"
- "Berry Smoothie Bowl"
- "Steak with Vegetables"

Return only the meal name, nothing else."#
    )
}

/// `"chicken breast (200g), rice (150g)"`.
pub fn format_food_list(foods: &[Value]) -> String {
    foods
        .iter()
        .map(|item| format!("{} ({}g)", field_text(item, "food"), field_text(item, "grams")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn field_text(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
