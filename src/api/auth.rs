use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::with_state;
use crate::app::AppState;
use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::http::{Response, StatusCode};
use crate::router::Router;
use crate::security::auth::TokenPair;
use crate::users::{NewUser, User, UserView};

pub(super) fn routes(router: &mut Router, state: &Arc<AppState>) {
    router.post("/auth/register", with_state(state, register));
    router.post("/auth/login", with_state(state, login));
    router.post("/auth/refresh", with_state(state, refresh));
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    user: UserView,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    refresh_token: String,
}

fn signed_in(state: &AppState, user: &User) -> AuthResponse {
    AuthResponse {
        tokens: state.tokens.issue(&user.principal()),
        user: user.view(),
    }
}

async fn register(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let mut input: NewUser = ctx.json()?;
    // Self-registration never grants elevated roles.
    input.role = None;
    let user = state.users.create(input)?;
    info!(user_id = %user.id, "registered user");

    Ok(Response::json(StatusCode::Created, &signed_in(&state, &user)))
}

async fn login(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let credentials: Credentials = ctx.json()?;
    let user = state
        .users
        .verify_credentials(&credentials.email, &credentials.password)?;
    info!(user_id = %user.id, "user logged in");

    Ok(Response::json(StatusCode::Ok, &signed_in(&state, &user)))
}

async fn refresh(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let body: RefreshRequest = ctx.json()?;
    let user_id = state.tokens.redeem_refresh(&body.refresh_token)?;
    let user = state
        .users
        .find(user_id)
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;

    let tokens = state.tokens.issue(&user.principal());
    Ok(Response::json(StatusCode::Ok, &tokens))
}
