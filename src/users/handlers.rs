use axum::{extract::State, routing::post, Json, Router};
use tracing::{instrument, warn};

use crate::{
    auth::{
        extractors::Caller,
        services::{check_password_length, is_valid_email},
    },
    error::{AppError, AppResult},
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, FamilyRequest, ProfileResponse, SucceedResponse,
            UpdateUserInfoRequest, UserIdRequest,
        },
        repo_types::ProfileFields,
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/UserInfo/GetUserInfo", post(get_user_info))
        .route("/UserInfo/GetUserInfoByID", post(get_user_info_by_id))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/UserInfo/UpdateUserInfo", post(update_user_info))
        .route("/UserInfo/ChangePassword", post(change_password))
        .route("/UserInfo/AddFamily", post(add_family))
        .route("/UserInfo/DeleteFamily", post(delete_family))
        .route("/UserInfo/DeleteUser", post(delete_user))
}

#[instrument(skip(state, caller))]
pub async fn get_user_info(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.profiles.get_profile(caller.user_id()?).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn get_user_info_by_id(
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.profiles.get_profile(req.user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user_info(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<UpdateUserInfoRequest>,
) -> AppResult<Json<SucceedResponse>> {
    let patch = ProfileFields::from(payload);
    if !patch.email.is_empty() && !is_valid_email(&patch.email) {
        warn!(email = %patch.email, "invalid email");
        return Err(AppError::validation("email format is invalid"));
    }

    state
        .profiles
        .update_profile(caller.user_id()?, patch)
        .await?;
    Ok(Json(SucceedResponse::ok()))
}

#[instrument(skip(state, caller, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<SucceedResponse>> {
    if payload.new_password.trim().is_empty() {
        return Err(AppError::validation("new password is required"));
    }
    check_password_length(&payload.new_password)?;

    state
        .profiles
        .change_password(
            caller.user_id()?,
            &payload.old_password,
            &payload.new_password,
        )
        .await?;
    Ok(Json(SucceedResponse::ok()))
}

#[instrument(skip(state))]
pub async fn add_family(
    State(state): State<AppState>,
    Json(req): Json<FamilyRequest>,
) -> AppResult<Json<SucceedResponse>> {
    state
        .profiles
        .add_family_link(req.user_id, req.family_id)
        .await?;
    Ok(Json(SucceedResponse::ok()))
}

#[instrument(skip(state))]
pub async fn delete_family(
    State(state): State<AppState>,
    Json(req): Json<FamilyRequest>,
) -> AppResult<Json<SucceedResponse>> {
    state
        .profiles
        .remove_family_link(req.user_id, req.family_id)
        .await?;
    Ok(Json(SucceedResponse::ok()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<Json<SucceedResponse>> {
    state.family.delete_user_everywhere(req.user_id).await?;
    Ok(Json(SucceedResponse::ok()))
}
