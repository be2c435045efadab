use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::{request_id, with_state};
use crate::app::AppState;
use crate::articles::NewArticle;
use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::http::{Response, StatusCode};
use crate::pagination::parse_int;
use crate::router::Router;

pub(super) fn routes(router: &mut Router, state: &Arc<AppState>) {
    router
        .post("/articles", with_state(state, create))
        .authenticated();
    router.get("/articles", with_state(state, list));
    router.get("/articles/:id", with_state(state, show));
}

async fn create(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let input: NewArticle = ctx.json()?;
    let article = state.articles.create(input)?;

    Ok(Response::json(
        StatusCode::Created,
        &json!({
            "requestId": request_id(&ctx),
            "article": article,
            "message": "Article created successfully",
        }),
    ))
}

async fn list(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let search = ctx.query("search").unwrap_or_default();
    info!(search, "listing articles");
    let articles = state.articles.search(search);

    Ok(Response::json(
        StatusCode::Ok,
        &json!({
            "requestId": request_id(&ctx),
            "total": articles.len(),
            "articles": articles,
            "searchTerm": search,
        }),
    ))
}

async fn show(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let raw_id = ctx.params().get("id").unwrap_or_default();
    let article = parse_int(raw_id)
        .and_then(|id| u64::try_from(id).ok())
        .and_then(|id| state.articles.find(id))
        .ok_or_else(|| {
            ApiError::not_found("Article", format!("Article with ID {raw_id} does not exist"))
        })?;

    Ok(Response::json(
        StatusCode::Ok,
        &json!({
            "requestId": request_id(&ctx),
            "article": article,
        }),
    ))
}
