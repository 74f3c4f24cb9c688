use crate::config::AppConfig;
use crate::gateway::{GeminiGateway, NutritionGateway};
use crate::tracker::MealTracker;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tracker: Arc<MealTracker>,
}

impl AppState {
    /// Fails when the AI credential is missing; the server must not start
    /// without it.
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let gateway = Arc::new(GeminiGateway::new(&config.gemini)?) as Arc<dyn NutritionGateway>;
        Ok(Self::from_parts(config, gateway))
    }

    pub fn from_parts(config: Arc<AppConfig>, gateway: Arc<dyn NutritionGateway>) -> Self {
        let tracker = MealTracker::spawn(gateway, config.insight_quiet_period());
        Self { config, tracker }
    }

    #[cfg(test)]
    pub fn fake(gateway: Arc<dyn NutritionGateway>) -> Self {
        use crate::config::{GeminiConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

        let config = Arc::new(AppConfig {
            gemini: GeminiConfig {
                api_key: "test".into(),
                model: DEFAULT_GEMINI_MODEL.into(),
                base_url: DEFAULT_GEMINI_BASE_URL.into(),
                timeout_secs: 5,
            },
            insight_quiet_period_ms: 1000,
        });
        Self::from_parts(config, gateway)
    }
}
