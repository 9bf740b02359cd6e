use axum::{extract::State, routing::post, Json, Router};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{SignInRequest, SignInResponse, SignUpRequest, SignUpResponse},
        services::{check_password_length, is_valid_email, SignUpInput},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/Auth/SignUp", post(sign_up))
        .route("/Auth/SignIn", post(sign_in))
}

fn required(value: &str, what: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{what} is required")));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(mut payload): Json<SignUpRequest>,
) -> AppResult<Json<SignUpResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("email format is invalid"));
    }
    required(&payload.password, "password")?;
    check_password_length(&payload.password)?;
    required(&payload.phone_number, "phone number")?;
    required(&payload.name, "name")?;
    required(&payload.surname, "surname")?;

    let user_id = state
        .identity
        .sign_up(SignUpInput {
            email: payload.email,
            password: payload.password,
            phone_number: payload.phone_number.trim().to_string(),
            name: payload.name.trim().to_string(),
            surname: payload.surname.trim().to_string(),
        })
        .await?;

    Ok(Json(SignUpResponse { user_id }))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(mut payload): Json<SignInRequest>,
) -> AppResult<Json<SignInResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("email format is invalid"));
    }
    required(&payload.password, "password")?;

    let token = state
        .identity
        .sign_in(&payload.email, &payload.password)
        .await?;
    Ok(Json(SignInResponse { token }))
}
