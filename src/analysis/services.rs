use serde_json::Value;
use tracing::{debug, info};

use super::spool::SpooledUpload;
use crate::ai::{
    extract, normalize_foods, normalize_totals,
    prompts::{self, format_food_list},
    ChatMessage, ChatRequest, NutrientTotals,
};
use crate::state::AppState;

/// Ask the vision model what is on the plate.
pub async fn identify_foods(st: &AppState, image: &SpooledUpload) -> anyhow::Result<Vec<Value>> {
    let data_uri = image.data_uri().await?;
    info!(
        size = image.size_bytes(),
        content_type = image.content_type(),
        "identifying foods"
    );

    let request = ChatRequest {
        model: st.config.openai.vision_model.clone(),
        messages: vec![
            ChatMessage::system(prompts::VISION_SYSTEM_PROMPT),
            ChatMessage::user_with_image(prompts::VISION_USER_PROMPT, data_uri),
        ],
        max_tokens: prompts::VISION_MAX_TOKENS,
        temperature: None,
    };
    let text = st.llm.complete(request).await?;

    let foods = normalize_foods(extract(&text));
    debug!(count = foods.len(), "foods identified");
    Ok(foods)
}

/// Ask the text model for the summed nutrients of `foods`.
pub async fn compute_totals(st: &AppState, foods: &[Value]) -> anyhow::Result<NutrientTotals> {
    let food_list = format_food_list(foods);
    let request = ChatRequest {
        model: st.config.openai.nutrient_model.clone(),
        messages: vec![
            ChatMessage::system(prompts::nutrient_system_prompt()),
            ChatMessage::user(prompts::nutrient_user_prompt(&food_list)),
        ],
        max_tokens: prompts::NUTRIENT_MAX_TOKENS,
        temperature: None,
    };
    let text = st.llm.complete(request).await?;
    Ok(normalize_totals(extract(&text)))
}

pub async fn generate_meal_name(st: &AppState, foods: &[Value]) -> anyhow::Result<String> {
    let food_list = format_food_list(foods);
    let request = ChatRequest {
        model: st.config.openai.meal_name_model.clone(),
        messages: vec![
            ChatMessage::system(prompts::MEAL_NAME_SYSTEM_PROMPT),
            ChatMessage::user(prompts::meal_name_prompt(&food_list)),
        ],
        max_tokens: prompts::MEAL_NAME_MAX_TOKENS,
        temperature: Some(prompts::MEAL_NAME_TEMPERATURE),
    };
    let text = st.llm.complete(request).await?;

    let name = text.trim();
    Ok(if name.is_empty() {
        prompts::DEFAULT_MEAL_NAME.to_string()
    } else {
        name.to_string()
    })
}
