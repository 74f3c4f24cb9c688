use crate::meals::types::{DailyTotals, UserGoal};

pub fn analyze_meal(description: &str) -> String {
    format!(
        r#"
You are an expert nutritionist with deep knowledge of a wide variety of regional Indian cuisines (e.g., North Indian like Paneer Butter Masala, South Indian like Dosa, Eastern like Litti Chokha, Western like Dhokla), common street foods (e.g., Pani Puri, Vada Pav), and traditional snacks.
Analyze the following meal description: "{description}".
Break down the meal into individual food items. For each item, estimate the quantity, calories, protein (in grams), carbohydrates (in grams), and fat (in grams).
Provide a brief one-sentence summary of the meal's nutritional profile.
Respond ONLY with a valid JSON object that adheres to the provided schema. Do not include any text, explanation, or markdown formatting outside of the JSON object.
"#
    )
}

pub fn recommendations(meals_log: &str) -> String {
    format!(
        r#"
You are a helpful and encouraging nutritionist. Based on the following JSON log of meals consumed today, provide 3-4 concise, actionable, and positive recommendations for improving the user's diet.
Frame the advice in a friendly tone. Do not repeat the daily totals. Focus on what they can do next.

Today's Meal Log:
{meals_log}

Your Recommendations (as a single block of plain text, with each recommendation on a new line):
"#
    )
}

pub fn meal_suggestion(meals_log: &str, totals: &DailyTotals, goal: UserGoal) -> String {
    let calories = totals.rounded_calories();
    let protein = totals.rounded_protein();
    format!(
        r#"
You are an expert nutritionist AI. The user's goal is "{goal}".
Based on their meal log so far today, suggest a specific, healthy Indian dish or meal combination for their *next* meal.
Keep the suggestion relevant to their goal (e.g., low-calorie for weight loss, high-protein for muscle gain).

User's Goal: {goal}
Today's Meals Log: {meals_log}
Today's Totals: {calories} kcal, {protein}g protein.

Your task is to provide a single meal suggestion as a JSON object. The reason should be concise and encouraging.
Respond ONLY with a valid JSON object that adheres to the provided schema. Do not include any other text.
"#
    )
}
