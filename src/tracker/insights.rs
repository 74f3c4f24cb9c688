//! Debounced recommendation and next-meal-suggestion fetches.
//!
//! Every change to the meal log or goal is a message on the worker's channel.
//! The worker waits until no message has arrived for the quiet period, then
//! starts one insight cycle against the state as it is at that moment. The
//! two calls of a cycle run as separate tasks and are never cancelled.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::MealTracker;
use crate::meals::types::{DailyTotals, Meal, MealType, UserGoal};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub meal: MealType,
    #[serde(serialize_with = "whole_as_integer")]
    pub total_calories: f64,
    pub items: String,
}

/// Writes `160.0` as `160` so the log reads like any other JSON producer's.
fn whole_as_integer<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Meal log in the shape both insight prompts embed.
pub fn log_entries(meals: &[Meal]) -> Vec<LogEntry> {
    meals
        .iter()
        .map(|m| LogEntry {
            meal: m.meal_type,
            total_calories: m.total_calories,
            items: m
                .food_items
                .iter()
                .map(|i| format!("{} ({})", i.name, i.quantity))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

pub fn serialize_log(meals: &[Meal]) -> String {
    serialize_entries(&log_entries(meals))
}

pub fn serialize_entries(entries: &[LogEntry]) -> String {
    // Plain structs of strings and numbers always serialize.
    serde_json::to_string_pretty(entries).unwrap_or_default()
}

/// Inputs for one cycle, captured when the timer fires.
#[derive(Debug, Clone)]
struct CycleInput {
    meals_log: String,
    totals: DailyTotals,
    goal: UserGoal,
}

pub(super) async fn run_worker(
    tracker: Weak<MealTracker>,
    mut changes: mpsc::UnboundedReceiver<()>,
    quiet_period: Duration,
) {
    let mut pending = false;
    let mut cycle: u64 = 0;

    loop {
        if pending {
            tokio::select! {
                msg = changes.recv() => {
                    if msg.is_none() {
                        return;
                    }
                }
                _ = tokio::time::sleep(quiet_period) => {
                    pending = false;
                    let Some(this) = tracker.upgrade() else { return };
                    cycle += 1;
                    this.start_insight_cycle(cycle);
                    continue;
                }
            }
        } else if changes.recv().await.is_none() {
            return;
        }

        // A change arrived: restart the quiet period, or reset right away when
        // there is nothing to talk about.
        let Some(this) = tracker.upgrade() else { return };
        pending = !this.clear_insights_if_empty();
        debug!(pending, "insight timer restarted");
    }
}

impl MealTracker {
    /// Returns true when the log is empty, after resetting both insight slots.
    fn clear_insights_if_empty(&self) -> bool {
        let mut st = self.state();
        if !st.meals.is_empty() {
            return false;
        }
        st.recommendations.clear();
        st.suggestion = None;
        true
    }

    fn start_insight_cycle(self: &Arc<Self>, cycle: u64) {
        let input = {
            let mut st = self.state();
            if st.meals.is_empty() {
                st.recommendations.clear();
                st.suggestion = None;
                return;
            }
            st.recommendation_loading = true;
            st.suggestion_loading = true;
            CycleInput {
                meals_log: serialize_log(&st.meals),
                totals: DailyTotals::from_meals(&st.meals),
                goal: st.goal,
            }
        };
        info!(cycle, goal = %input.goal, "starting insight cycle");

        let span = info_span!("insight_cycle", cycle);

        let this = Arc::clone(self);
        let log = input.meals_log.clone();
        tokio::spawn(
            async move {
                let result = this.gateway.get_recommendations(&log).await;
                let mut st = this.state();
                match result {
                    Ok(text) => st.recommendations = text,
                    Err(e) => warn!(error = %e, "failed to get recommendations"),
                }
                st.recommendation_loading = false;
            }
            .instrument(span.clone()),
        );

        let this = Arc::clone(self);
        tokio::spawn(
            async move {
                let result = this
                    .gateway
                    .get_meal_suggestion(&input.meals_log, &input.totals, input.goal)
                    .await;
                let mut st = this.state();
                match result {
                    Ok(suggestion) => st.suggestion = Some(suggestion),
                    Err(e) => {
                        error!(error = %e, "failed to get meal suggestion");
                        st.suggestion = None;
                    }
                }
                st.suggestion_loading = false;
            }
            .instrument(span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::meals::types::{FoodItem, MealSuggestion};
    use crate::tracker::testing::{paneer_suggestion, FakeGateway};

    const QUIET: Duration = Duration::from_secs(1);

    fn meal(id: u64, meal_type: MealType, items: &[(&str, &str)], total_calories: f64) -> Meal {
        Meal {
            id,
            meal_type,
            description: String::new(),
            food_items: items
                .iter()
                .map(|(name, quantity)| FoodItem {
                    name: name.to_string(),
                    quantity: quantity.to_string(),
                    calories: 0.0,
                    protein: 0.0,
                    carbs: 0.0,
                    fat: 0.0,
                })
                .collect(),
            total_calories,
            summary: String::new(),
        }
    }

    async fn settle() {
        // Let the spawned insight tasks run to completion.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn log_lists_items_with_quantities() {
        let meals = vec![
            meal(1, MealType::Breakfast, &[("Idli", "3 pieces"), ("Sambar", "1 bowl")], 300.0),
            meal(2, MealType::Lunch, &[("Roti", "2 pieces")], 160.0),
        ];
        let entries = log_entries(&meals);
        assert_eq!(entries[0].items, "Idli (3 pieces), Sambar (1 bowl)");
        assert_eq!(entries[1].meal, MealType::Lunch);

        let blob = serialize_log(&meals);
        assert!(blob.contains("\"meal\": \"Breakfast\""));
        assert!(blob.contains("\"totalCalories\": 160,"));
    }

    #[test]
    fn fractional_calories_keep_their_decimals() {
        let blob = serialize_log(&[meal(1, MealType::Snack, &[("Chai", "1 cup")], 92.5)]);
        assert!(blob.contains("\"totalCalories\": 92.5,"));
    }

    #[test]
    fn serialization_is_deterministic_and_reparses() {
        let meals = vec![meal(1, MealType::Dinner, &[("Dal", "1 bowl")], 220.0)];
        let a = serialize_log(&meals);
        let b = serialize_log(&meals.clone());
        assert_eq!(a, b);

        let reparsed: Vec<LogEntry> = serde_json::from_str(&a).unwrap();
        assert_eq!(serialize_entries(&reparsed), a);
    }

    #[test]
    fn empty_log_serializes_to_empty_array() {
        assert_eq!(serialize_log(&[]), "[]");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_goal_changes_trigger_one_cycle() {
        let gateway = Arc::new(FakeGateway::default());
        let t = MealTracker::spawn(gateway.clone(), QUIET);
        t.log_meal("2 rotis", MealType::Lunch).await.unwrap();

        for goal in [UserGoal::WeightLoss, UserGoal::MuscleGain, UserGoal::WeightLoss] {
            tokio::time::sleep(Duration::from_millis(300)).await;
            t.set_goal(goal);
        }
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(gateway.insight_calls(), (0, 0));

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(gateway.insight_calls(), (1, 1));
        assert_eq!(*gateway.last_goal.lock().unwrap(), Some(UserGoal::WeightLoss));

        tokio::time::sleep(QUIET * 5).await;
        settle().await;
        assert_eq!(gateway.insight_calls(), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_fills_both_slots_from_the_current_log() {
        let gateway = Arc::new(FakeGateway::default());
        let t = MealTracker::spawn(gateway.clone(), QUIET);
        let meal = t.log_meal("2 rotis", MealType::Lunch).await.unwrap();

        tokio::time::sleep(QUIET * 2).await;
        settle().await;

        let snap = t.snapshot();
        assert_eq!(snap.recommendations, "Eat more greens.");
        assert_eq!(snap.meal_suggestion, Some(paneer_suggestion()));
        assert!(!snap.is_recommendation_loading);
        assert!(!snap.is_suggestion_loading);
        assert_eq!(
            gateway.last_log.lock().unwrap().as_deref(),
            Some(serialize_log(&[meal]).as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn goal_change_with_empty_log_makes_no_calls() {
        let gateway = Arc::new(FakeGateway::default());
        let t = MealTracker::spawn(gateway.clone(), QUIET);

        t.set_goal(UserGoal::MuscleGain);
        tokio::time::sleep(QUIET * 3).await;
        settle().await;

        assert_eq!(gateway.insight_calls(), (0, 0));
        let snap = t.snapshot();
        assert!(snap.recommendations.is_empty());
        assert!(snap.meal_suggestion.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn recommendation_failure_keeps_previous_text_and_suggestion_succeeds() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.push_recommendations(Ok("First advice.".into()));
        gateway.push_recommendations(Err(GatewayError::Transport("timeout".into())));
        let updated = MealSuggestion {
            meal_name: "Moong Dal Chilla".into(),
            ..paneer_suggestion()
        };
        gateway.push_suggestion(Ok(paneer_suggestion()));
        gateway.push_suggestion(Ok(updated.clone()));

        let t = MealTracker::spawn(gateway.clone(), QUIET);
        t.log_meal("2 rotis", MealType::Lunch).await.unwrap();
        tokio::time::sleep(QUIET * 2).await;
        settle().await;
        assert_eq!(t.snapshot().recommendations, "First advice.");

        t.set_goal(UserGoal::MuscleGain);
        tokio::time::sleep(QUIET * 2).await;
        settle().await;

        let snap = t.snapshot();
        assert_eq!(gateway.insight_calls(), (2, 2));
        assert_eq!(snap.recommendations, "First advice.");
        assert_eq!(snap.meal_suggestion, Some(updated));
        assert!(!snap.is_recommendation_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn suggestion_failure_clears_it_and_recommendations_succeed() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.push_suggestion(Ok(paneer_suggestion()));
        gateway.push_suggestion(Err(GatewayError::Malformed("eof".into())));
        gateway.push_recommendations(Ok("Old.".into()));
        gateway.push_recommendations(Ok("New.".into()));

        let t = MealTracker::spawn(gateway.clone(), QUIET);
        t.log_meal("2 rotis", MealType::Lunch).await.unwrap();
        tokio::time::sleep(QUIET * 2).await;
        settle().await;
        assert!(t.snapshot().meal_suggestion.is_some());

        t.log_meal("chai", MealType::Snack).await.unwrap();
        tokio::time::sleep(QUIET * 2).await;
        settle().await;

        let snap = t.snapshot();
        assert!(snap.meal_suggestion.is_none());
        assert_eq!(snap.recommendations, "New.");
        assert!(!snap.is_suggestion_loading);
    }
}
