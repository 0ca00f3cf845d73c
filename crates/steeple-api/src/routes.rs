use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{leaderboard, rewards, users};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/user", post(users::create_user))
        .route("/user/{user_id}", get(users::get_user))
        .route("/referred-users/{user_id}", get(users::get_referred_users))
        .route("/claim-daily-bonus/{user_id}", post(rewards::claim_daily_bonus))
        .route("/task/{task}/{user_id}", post(rewards::claim_task_bonus))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
