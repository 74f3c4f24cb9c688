use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

/// One food item as estimated by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub quantity: String, // free-form, e.g. "1 bowl"
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Result of a single meal analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub food_items: Vec<FoodItem>,
    pub total_calories: f64,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MealType {
    Breakfast,
    #[default]
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Case-insensitive, surrounding whitespace ignored.
impl FromStr for MealType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "meal type",
                value: s.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for MealType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A logged meal. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: u64,
    #[serde(rename = "type")]
    pub meal_type: MealType,
    pub description: String,
    pub food_items: Vec<FoodItem>,
    pub total_calories: f64,
    pub summary: String,
}

impl Meal {
    pub fn from_analysis(
        id: u64,
        meal_type: MealType,
        description: String,
        analysis: MealAnalysis,
    ) -> Self {
        Self {
            id,
            meal_type,
            description,
            food_items: analysis.food_items,
            total_calories: analysis.total_calories,
            summary: analysis.summary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum UserGoal {
    #[serde(rename = "Weight Loss")]
    WeightLoss,
    #[serde(rename = "Muscle Gain")]
    MuscleGain,
    #[default]
    #[serde(rename = "Balanced Diet")]
    BalancedDiet,
}

impl UserGoal {
    /// Display order used by the goal selector.
    pub const ALL: [UserGoal; 3] = [
        UserGoal::WeightLoss,
        UserGoal::MuscleGain,
        UserGoal::BalancedDiet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserGoal::WeightLoss => "Weight Loss",
            UserGoal::MuscleGain => "Muscle Gain",
            UserGoal::BalancedDiet => "Balanced Diet",
        }
    }
}

impl fmt::Display for UserGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserGoal {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserGoal::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "goal",
                value: s.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for UserGoal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSuggestion {
    pub meal_name: String,
    pub reason: String,
    pub estimated_calories: f64,
    pub estimated_protein: f64,
}

/// Running totals for the day. Always derived from the meal list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSlice {
    pub name: &'static str,
    pub value: i64,
}

impl DailyTotals {
    /// Calories sum per meal; macros sum over every food item of every meal.
    pub fn from_meals(meals: &[Meal]) -> Self {
        meals.iter().fold(Self::default(), |mut acc, meal| {
            acc.calories += meal.total_calories;
            for item in &meal.food_items {
                acc.protein += item.protein;
                acc.carbs += item.carbs;
                acc.fat += item.fat;
            }
            acc
        })
    }

    pub fn rounded_calories(&self) -> i64 {
        self.calories.round() as i64
    }

    pub fn rounded_protein(&self) -> i64 {
        self.protein.round() as i64
    }

    /// Rounded macro grams for the summary chart; zero slices are dropped.
    pub fn macro_breakdown(&self) -> Vec<MacroSlice> {
        [
            ("Protein (g)", self.protein),
            ("Carbs (g)", self.carbs),
            ("Fat (g)", self.fat),
        ]
        .into_iter()
        .map(|(name, grams)| MacroSlice {
            name,
            value: grams.round() as i64,
        })
        .filter(|s| s.value > 0)
        .collect()
    }
}
