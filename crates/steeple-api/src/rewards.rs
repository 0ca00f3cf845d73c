use axum::{
    Json,
    extract::{Path, State},
};

use steeple_types::api::BonusResponse;
use steeple_types::models::SocialTask;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /claim-daily-bonus/{user_id}
pub async fn claim_daily_bonus(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<BonusResponse>> {
    let bonus_tokens = state
        .run(move |ledger| ledger.rewards.claim_daily_bonus(&user_id))
        .await?;

    Ok(Json(BonusResponse {
        message: "Daily bonus claimed successfully".into(),
        bonus_tokens,
    }))
}

/// POST /task/{task}/{user_id} where task is twitter, tg, invite-3 or invite-7.
pub async fn claim_task_bonus(
    State(state): State<AppState>,
    Path((task, user_id)): Path<(String, String)>,
) -> ApiResult<Json<BonusResponse>> {
    let task = SocialTask::from_slug(&task)
        .ok_or_else(|| ApiError::NotFound(format!("unknown task '{}'", task)))?;

    let bonus_tokens = state
        .run(move |ledger| ledger.rewards.claim_task_bonus(&user_id, task))
        .await?;

    Ok(Json(BonusResponse {
        message: format!("Task bonus for {} credited", task),
        bonus_tokens,
    }))
}
