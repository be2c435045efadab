use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::with_state;
use crate::app::AppState;
use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::http::{Response, StatusCode};
use crate::router::Router;
use crate::security::auth::{Principal, Role};
use crate::users::{NewUser, ProfileUpdate, UserView};

pub(super) fn routes(router: &mut Router, state: &Arc<AppState>) {
    router
        .get("/users", with_state(state, list))
        .require_role(Role::Admin);
    router
        .post("/users", with_state(state, create))
        .require_role(Role::Admin);
    router
        .get("/users/profile", with_state(state, profile))
        .authenticated();
    router
        .patch("/users/profile", with_state(state, update_profile))
        .authenticated();
    router
        .get("/users/:id", with_state(state, show))
        .require_role(Role::Admin);
    router
        .delete("/users/:id", with_state(state, remove))
        .require_role(Role::Admin);
}

fn caller(ctx: &Context) -> ApiResult<&Principal> {
    ctx.principal()
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))
}

fn user_id(ctx: &Context) -> ApiResult<Uuid> {
    ctx.params()
        .get("id")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| ApiError::bad_request("Validation failed (uuid is expected)"))
}

async fn list(state: Arc<AppState>, _ctx: Context) -> ApiResult<Response> {
    let users: Vec<UserView> = state.users.list().iter().map(UserView::from).collect();
    Ok(Response::json(StatusCode::Ok, &users))
}

async fn create(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let input: NewUser = ctx.json()?;
    let user = state.users.create(input)?;
    Ok(Response::json(StatusCode::Created, &user.view()))
}

async fn profile(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let user = state.users.find(caller(&ctx)?.user_id)?;
    Ok(Response::json(StatusCode::Ok, &user.view()))
}

async fn update_profile(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let update: ProfileUpdate = ctx.json()?;
    let user = state.users.update_profile(caller(&ctx)?.user_id, update)?;
    Ok(Response::json(StatusCode::Ok, &user.view()))
}

async fn show(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let user = state.users.find(user_id(&ctx)?)?;
    Ok(Response::json(StatusCode::Ok, &user.view()))
}

async fn remove(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let id = user_id(&ctx)?;
    state.users.delete(id)?;
    state.tokens.revoke_user(id);
    Ok(Response::json(
        StatusCode::Ok,
        &json!({ "message": "User deleted successfully" }),
    ))
}
