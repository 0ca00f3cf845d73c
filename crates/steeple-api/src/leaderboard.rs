use axum::{
    Json,
    extract::{Query, State},
};

use steeple_types::api::{LeaderboardQuery, LeaderboardResponse};

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /leaderboard?page=&pageSize=&userId=
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let board = state
        .run(move |ledger| {
            ledger.leaderboard.get_leaderboard(
                query.paging.page(),
                query.paging.page_size(),
                query.user_id.as_deref(),
            )
        })
        .await?;

    Ok(Json(board))
}
