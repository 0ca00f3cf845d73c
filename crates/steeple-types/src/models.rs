use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user per external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: Option<String>,
    pub token_count: i64,
    pub referral_key: String,
    /// Referral key of the user who referred this one.
    pub referred_by: Option<String>,
    pub bonus_claimed_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable record of one referrer -> referred relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEdge {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub direct_referrer: bool,
    pub coins_earned: i64,
    pub last_reward_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Flat social-task bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialTask {
    Twitter,
    Telegram,
    InviteThree,
    InviteSeven,
}

impl SocialTask {
    pub const ALL: [SocialTask; 4] = [
        SocialTask::Twitter,
        SocialTask::Telegram,
        SocialTask::InviteThree,
        SocialTask::InviteSeven,
    ];

    /// Path segment used on the HTTP surface.
    pub fn slug(self) -> &'static str {
        match self {
            SocialTask::Twitter => "twitter",
            SocialTask::Telegram => "tg",
            SocialTask::InviteThree => "invite-3",
            SocialTask::InviteSeven => "invite-7",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.slug() == slug)
    }
}

impl std::fmt::Display for SocialTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(current_page: u32, page_size: u32, total_items: u64) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            current_page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(size),
        }
    }
}
