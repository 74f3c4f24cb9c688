//! Response schemas sent alongside structured requests.

use serde_json::{json, Value};

pub fn meal_analysis() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "foodItems": {
                "type": "ARRAY",
                "description": "A list of food items identified in the meal.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Name of the food item." },
                        "quantity": { "type": "STRING", "description": "Estimated quantity (e.g., \"1 bowl\", \"2 pieces\")." },
                        "calories": { "type": "NUMBER", "description": "Estimated calories for the item." },
                        "protein": { "type": "NUMBER", "description": "Estimated protein in grams." },
                        "carbs": { "type": "NUMBER", "description": "Estimated carbohydrates in grams." },
                        "fat": { "type": "NUMBER", "description": "Estimated fat in grams." }
                    },
                    "required": ["name", "quantity", "calories", "protein", "carbs", "fat"]
                }
            },
            "totalCalories": {
                "type": "NUMBER",
                "description": "The sum of calories for all food items."
            },
            "summary": {
                "type": "STRING",
                "description": "A brief, one-sentence summary of the meal's nutritional profile."
            }
        },
        "required": ["foodItems", "totalCalories", "summary"]
    })
}

pub fn meal_suggestion() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "mealName": { "type": "STRING", "description": "The name of the suggested meal (e.g., \"Grilled Chicken Salad\")." },
            "reason": { "type": "STRING", "description": "A brief, one-sentence explanation of why this meal is a good choice for the user's goal." },
            "estimatedCalories": { "type": "NUMBER", "description": "The estimated calorie count for the suggested meal." },
            "estimatedProtein": { "type": "NUMBER", "description": "The estimated protein in grams for the suggested meal." }
        },
        "required": ["mealName", "reason", "estimatedCalories", "estimatedProtein"]
    })
}
