use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use steeple_types::api::{CreateUserRequest, CreateUserResponse, PageQuery, UserResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /user: find-or-create by external identity.
/// 201 when the user was created, 200 when it already existed.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| {
        debug!("Rejected POST /user body: {}", e);
        ApiError::BadRequest("body must be JSON with a non-empty externalId".into())
    })?;

    let onboarded = state
        .run(move |ledger| {
            ledger.onboarding.get_or_create_user(
                &req.external_id,
                req.display_name.as_deref(),
                req.referral_key.as_deref(),
            )
        })
        .await?;

    let status = if onboarded.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(CreateUserResponse {
            user: onboarded.user,
            is_new: onboarded.is_new,
        }),
    ))
}

/// GET /user/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .run(move |ledger| ledger.onboarding.get_user(&user_id))
        .await?;

    Ok(Json(UserResponse { user }))
}

/// GET /referred-users/{user_id}?page=&pageSize=
pub async fn get_referred_users(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .run(move |ledger| {
            ledger
                .referrals
                .list_referred_users(&user_id, query.page(), query.page_size())
        })
        .await?;

    Ok(Json(page))
}
