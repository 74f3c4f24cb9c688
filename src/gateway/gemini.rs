use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{prompts, schema, GatewayError, NutritionGateway};
use crate::config::GeminiConfig;
use crate::meals::types::{DailyTotals, MealAnalysis, MealSuggestion, UserGoal};

// ---- wire types ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ---- gateway ----

/// Talks to the Generative Language `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGateway {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request(prompt: String, response_schema: Option<serde_json::Value>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: response_schema.map(|response_schema| GenerationConfig {
                response_mime_type: "application/json",
                response_schema,
            }),
        }
    }

    /// One round trip; returns the trimmed text of the first candidate.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, GatewayError> {
        debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(self.url())
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!(%status, "generateContent returned an error status");
            return Err(map_api_error(status.as_u16(), &body));
        }

        extract_text(&body)
    }

    async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: String,
        response_schema: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let request = Self::build_request(prompt, Some(response_schema));
        let text = self.generate(&request).await?;
        parse_structured(&text)
    }
}

fn map_api_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<GenerateContentResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map_or_else(|| body.to_string(), |e| e.message);
    GatewayError::Api { status, message }
}

fn extract_text(body: &str) -> Result<String, GatewayError> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "failed to decode generateContent envelope");
        GatewayError::Malformed(e.to_string())
    })?;

    if let Some(err) = response.error {
        return Err(GatewayError::Api {
            status: 200,
            message: err.message,
        });
    }

    let text: String = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(text.to_string())
}

fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, GatewayError> {
    serde_json::from_str(text).map_err(|e| {
        error!(error = %e, response_text = %text, "model response did not match the requested shape");
        GatewayError::Malformed(e.to_string())
    })
}

#[async_trait]
impl NutritionGateway for GeminiGateway {
    #[instrument(skip(self, description))]
    async fn analyze_meal(&self, description: &str) -> Result<MealAnalysis, GatewayError> {
        self.generate_json(prompts::analyze_meal(description), schema::meal_analysis())
            .await
    }

    #[instrument(skip(self, meals_log))]
    async fn get_recommendations(&self, meals_log: &str) -> Result<String, GatewayError> {
        let request = Self::build_request(prompts::recommendations(meals_log), None);
        self.generate(&request).await
    }

    #[instrument(skip(self, meals_log, totals))]
    async fn get_meal_suggestion(
        &self,
        meals_log: &str,
        totals: &DailyTotals,
        goal: UserGoal,
    ) -> Result<MealSuggestion, GatewayError> {
        self.generate_json(
            prompts::meal_suggestion(meals_log, totals, goal),
            schema::meal_suggestion(),
        )
        .await
    }
}

impl fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
