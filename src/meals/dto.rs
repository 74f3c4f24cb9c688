use serde::{Deserialize, Serialize};

use crate::meals::types::{MealType, UserGoal};

#[derive(Debug, Deserialize)]
pub struct LogMealRequest {
    pub description: String,
    #[serde(rename = "type", default)]
    pub meal_type: MealType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoalBody {
    pub goal: UserGoal,
}

#[derive(Debug, Serialize)]
pub struct GoalOption {
    pub id: UserGoal,
    pub label: &'static str,
}

impl From<UserGoal> for GoalOption {
    fn from(goal: UserGoal) -> Self {
        Self {
            id: goal,
            label: goal.as_str(),
        }
    }
}
