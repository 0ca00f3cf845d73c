use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Pagination, User};

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(alias = "telegramId")]
    pub external_id: String,
    #[serde(default, alias = "username")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub referral_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user: User,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

// -- Rewards --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusResponse {
    pub message: String,
    pub bonus_tokens: i64,
}

// -- Paging --

/// `?page=&pageSize=` as sent by clients. Values that do not parse are
/// treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Option<i64> {
        self.page.as_deref().and_then(|v| v.trim().parse().ok())
    }

    pub fn page_size(&self) -> Option<i64> {
        self.page_size.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    #[serde(flatten)]
    pub paging: PageQuery,
    pub user_id: Option<String>,
}

// -- Referrals --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUser {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: Option<String>,
    pub token_count: i64,
    pub total_earned: i64,
    pub recent_earnings: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUsersResponse {
    pub referred_users: Vec<ReferredUser>,
    pub pagination: Pagination,
    pub total_recent_earnings: i64,
}

// -- Leaderboard --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub token_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub pagination: Pagination,
    /// Strictly-greater rank of the requesting user, if one was given and found.
    pub current_user_rank: Option<u64>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
