use async_trait::async_trait;

use crate::meals::types::{DailyTotals, MealAnalysis, MealSuggestion, UserGoal};

pub mod gemini;
pub mod prompts;
mod schema;

pub use gemini::GeminiGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to AI service failed: {0}")]
    Transport(String),
    #[error("AI service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("AI service returned no content")]
    EmptyResponse,
    #[error("malformed AI response: {0}")]
    Malformed(String),
}

/// Everything the tracker needs from the language model. One round trip per
/// call; no retries.
#[async_trait]
pub trait NutritionGateway: Send + Sync {
    async fn analyze_meal(&self, description: &str) -> Result<MealAnalysis, GatewayError>;

    async fn get_recommendations(&self, meals_log: &str) -> Result<String, GatewayError>;

    async fn get_meal_suggestion(
        &self,
        meals_log: &str,
        totals: &DailyTotals,
        goal: UserGoal,
    ) -> Result<MealSuggestion, GatewayError>;
}
