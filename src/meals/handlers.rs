use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    meals::{
        dto::{GoalBody, GoalOption, LogMealRequest},
        types::{Meal, UserGoal},
    },
    state::AppState,
    tracker::{Dashboard, ANALYZE_FAILED_MESSAGE},
};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/goals", get(list_goals))
}

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(log_meal))
        .route("/goal", get(get_goal).put(set_goal))
}

#[instrument(skip(state))]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    Json(state.tracker.snapshot())
}

#[instrument(skip(state))]
pub async fn list_meals(State(state): State<AppState>) -> Json<Vec<Meal>> {
    Json(state.tracker.meals())
}

/// Malformed bodies, unknown meal types and unknown goals are all a 400.
fn bad_body(rejection: JsonRejection) -> (StatusCode, String) {
    let msg = rejection.body_text();
    warn!(error = %msg, "rejected request body");
    (StatusCode::BAD_REQUEST, msg)
}

/// POST /meals { description, type? }
#[instrument(skip(state, payload))]
pub async fn log_meal(
    State(state): State<AppState>,
    payload: Result<Json<LogMealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Meal>), (StatusCode, String)> {
    let Json(payload) = payload.map_err(bad_body)?;
    if payload.description.trim().is_empty() {
        warn!("empty meal description");
        return Err((StatusCode::BAD_REQUEST, "Description is required".into()));
    }

    // Run the flow on its own task so a dropped connection cannot abandon it halfway.
    let tracker = state.tracker.clone();
    let outcome = tokio::spawn(async move {
        tracker
            .log_meal(&payload.description, payload.meal_type)
            .await
    })
    .await;

    match outcome {
        Ok(Ok(meal)) => Ok((StatusCode::CREATED, Json(meal))),
        Ok(Err(_)) => Err((StatusCode::BAD_GATEWAY, ANALYZE_FAILED_MESSAGE.into())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

#[instrument(skip(state))]
pub async fn get_goal(State(state): State<AppState>) -> Json<GoalBody> {
    Json(GoalBody {
        goal: state.tracker.goal(),
    })
}

#[instrument(skip(state, body))]
pub async fn set_goal(
    State(state): State<AppState>,
    body: Result<Json<GoalBody>, JsonRejection>,
) -> Result<Json<GoalBody>, (StatusCode, String)> {
    let Json(body) = body.map_err(bad_body)?;
    state.tracker.set_goal(body.goal);
    Ok(Json(body))
}

pub async fn list_goals() -> Json<Vec<GoalOption>> {
    Json(UserGoal::ALL.into_iter().map(GoalOption::from).collect())
}
