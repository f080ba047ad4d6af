pub mod client;
pub mod extract;
pub mod normalize;
pub mod prompts;
#[cfg(test)]
pub mod stub;

pub use client::{ChatClient, ChatMessage, ChatRequest, OpenAiClient};
pub use extract::{extract, Parsed};
pub use normalize::{normalize_foods, normalize_totals, NutrientTotals};
