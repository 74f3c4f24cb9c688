use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::gateway::{GatewayError, NutritionGateway};
use crate::meals::types::{DailyTotals, MacroSlice, Meal, MealSuggestion, MealType, UserGoal};

pub mod insights;

/// The only message a failed analysis ever shows the user.
pub const ANALYZE_FAILED_MESSAGE: &str = "Sorry, I couldn't analyze that meal. Please try again.";

#[derive(Debug, Default)]
struct TrackerState {
    meals: Vec<Meal>,
    goal: UserGoal,
    recommendations: String,
    suggestion: Option<MealSuggestion>,
    logging_in_flight: usize,
    recommendation_loading: bool,
    suggestion_loading: bool,
    error: Option<String>,
    last_id: u64,
}

impl TrackerState {
    /// Millisecond timestamp, bumped past the previous id when the clock has
    /// not moved on.
    fn next_id(&mut self) -> u64 {
        let id = unix_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }
}

/// A clock before the epoch reads as 0; ids then come from the counter alone.
fn unix_millis() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

/// Read model handed to the client on every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub meals: Vec<Meal>,
    pub goal: UserGoal,
    pub daily_totals: DailyTotals,
    pub macro_breakdown: Vec<MacroSlice>,
    pub recommendations: String,
    pub meal_suggestion: Option<MealSuggestion>,
    pub is_loading: bool,
    pub is_recommendation_loading: bool,
    pub is_suggestion_loading: bool,
    pub error: Option<String>,
}

/// Owns one in-memory tracking session: the meal log, the goal and the two
/// insight slots. Mutated only through `log_meal`, `set_goal` and the
/// insight worker.
pub struct MealTracker {
    gateway: Arc<dyn NutritionGateway>,
    state: Mutex<TrackerState>,
    changes: mpsc::UnboundedSender<()>,
}

impl MealTracker {
    /// Builds the tracker and starts its insight worker on the current runtime.
    pub fn spawn(gateway: Arc<dyn NutritionGateway>, quiet_period: Duration) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Arc::new(Self {
            gateway,
            state: Mutex::new(TrackerState::default()),
            changes: tx,
        });
        tokio::spawn(insights::run_worker(Arc::downgrade(&tracker), rx, quiet_period));
        tracker
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify_changed(&self) {
        // Fails only once the worker is gone, i.e. during shutdown.
        let _ = self.changes.send(());
    }

    pub fn meals(&self) -> Vec<Meal> {
        self.state().meals.clone()
    }

    pub fn goal(&self) -> UserGoal {
        self.state().goal
    }

    pub fn snapshot(&self) -> Dashboard {
        let st = self.state();
        let daily_totals = DailyTotals::from_meals(&st.meals);
        Dashboard {
            meals: st.meals.clone(),
            goal: st.goal,
            daily_totals,
            macro_breakdown: daily_totals.macro_breakdown(),
            recommendations: st.recommendations.clone(),
            meal_suggestion: st.suggestion.clone(),
            is_loading: st.logging_in_flight > 0,
            is_recommendation_loading: st.recommendation_loading,
            is_suggestion_loading: st.suggestion_loading,
            error: st.error.clone(),
        }
    }

    pub fn set_goal(&self, goal: UserGoal) {
        self.state().goal = goal;
        info!(%goal, "goal updated");
        self.notify_changed();
    }

    /// Analyzes `description` and appends the resulting meal. The caller is
    /// expected to reject blank descriptions. Overlapping calls are not
    /// serialized; each appends in completion order.
    #[instrument(skip(self, description))]
    pub async fn log_meal(&self, description: &str, meal_type: MealType) -> Result<Meal, GatewayError> {
        let _logging = LoggingGuard::begin(self);

        match self.gateway.analyze_meal(description).await {
            Ok(analysis) => {
                let meal = {
                    let mut st = self.state();
                    let id = st.next_id();
                    let meal = Meal::from_analysis(id, meal_type, description.to_string(), analysis);
                    st.meals.push(meal.clone());
                    meal
                };
                info!(meal_id = meal.id, meal_type = %meal.meal_type, total_calories = meal.total_calories, "meal logged");
                self.notify_changed();
                Ok(meal)
            }
            Err(e) => {
                error!(error = %e, "meal analysis failed");
                self.state().error = Some(ANALYZE_FAILED_MESSAGE.to_string());
                Err(e)
            }
        }
    }
}

/// Keeps the logging flag raised while an analysis is in flight. Dropping it
/// lowers the flag even if the caller's future is cancelled.
struct LoggingGuard<'a> {
    tracker: &'a MealTracker,
}

impl<'a> LoggingGuard<'a> {
    fn begin(tracker: &'a MealTracker) -> Self {
        let mut st = tracker.state();
        st.logging_in_flight += 1;
        st.error = None;
        Self { tracker }
    }
}

impl Drop for LoggingGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.tracker.state();
        st.logging_in_flight = st.logging_in_flight.saturating_sub(1);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::meals::types::{FoodItem, MealAnalysis};

    /// Scripted gateway: pops queued results, falls back to canned successes.
    #[derive(Default)]
    pub struct FakeGateway {
        pub analyses: Mutex<VecDeque<Result<MealAnalysis, GatewayError>>>,
        pub analysis_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
        pub recommendations: Mutex<VecDeque<Result<String, GatewayError>>>,
        pub suggestions: Mutex<VecDeque<Result<MealSuggestion, GatewayError>>>,
        pub analyze_calls: AtomicUsize,
        pub recommendation_calls: AtomicUsize,
        pub suggestion_calls: AtomicUsize,
        pub last_log: Mutex<Option<String>>,
        pub last_goal: Mutex<Option<UserGoal>>,
    }

    impl FakeGateway {
        /// The next analyze call blocks until the returned sender fires.
        pub fn gate_analysis(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.analysis_gates.lock().unwrap().push_back(rx);
            tx
        }

        pub fn push_analysis(&self, r: Result<MealAnalysis, GatewayError>) {
            self.analyses.lock().unwrap().push_back(r);
        }

        pub fn push_recommendations(&self, r: Result<String, GatewayError>) {
            self.recommendations.lock().unwrap().push_back(r);
        }

        pub fn push_suggestion(&self, r: Result<MealSuggestion, GatewayError>) {
            self.suggestions.lock().unwrap().push_back(r);
        }

        pub fn insight_calls(&self) -> (usize, usize) {
            (
                self.recommendation_calls.load(Ordering::SeqCst),
                self.suggestion_calls.load(Ordering::SeqCst),
            )
        }
    }

    pub fn roti_analysis() -> MealAnalysis {
        MealAnalysis {
            food_items: vec![FoodItem {
                name: "Roti".into(),
                quantity: "2 pieces".into(),
                calories: 160.0,
                protein: 6.0,
                carbs: 30.0,
                fat: 2.0,
            }],
            total_calories: 160.0,
            summary: "Balanced".into(),
        }
    }

    pub fn paneer_suggestion() -> MealSuggestion {
        MealSuggestion {
            meal_name: "Paneer Tikka".into(),
            reason: "High in protein.".into(),
            estimated_calories: 350.0,
            estimated_protein: 25.0,
        }
    }

    #[async_trait]
    impl NutritionGateway for FakeGateway {
        async fn analyze_meal(&self, _description: &str) -> Result<MealAnalysis, GatewayError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.analysis_gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let next = self.analyses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(roti_analysis()))
        }

        async fn get_recommendations(&self, meals_log: &str) -> Result<String, GatewayError> {
            self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_log.lock().unwrap() = Some(meals_log.to_string());
            let next = self.recommendations.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok("Eat more greens.".into()))
        }

        async fn get_meal_suggestion(
            &self,
            _meals_log: &str,
            _totals: &DailyTotals,
            goal: UserGoal,
        ) -> Result<MealSuggestion, GatewayError> {
            self.suggestion_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_goal.lock().unwrap() = Some(goal);
            let next = self.suggestions.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(paneer_suggestion()))
        }
    }
}
