use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use super::{request_id, with_state};
use crate::app::AppState;
use crate::context::Context;
use crate::demo::synthetic_items;
use crate::error::{ApiError, ApiResult};
use crate::http::{Response, StatusCode};
use crate::pagination::{PageQuery, paginate};
use crate::router::Router;

const ITEMS_TOTAL: u64 = 100;
const TEST_ITEMS_TOTAL: u64 = 50;

pub(super) fn routes(router: &mut Router, state: &Arc<AppState>) {
    router.get("/demo/echo", echo);
    router.get("/demo/error", fail);
    router.get("/demo/random", with_state(state, random));
    router.get("/demo/items", |ctx: Context| items(ctx, ITEMS_TOTAL));
    router.get("/demo/test-pagination", |ctx: Context| {
        items(ctx, TEST_ITEMS_TOTAL)
    });
}

async fn echo(ctx: Context) -> Response {
    let x = ctx.query("x").filter(|x| !x.is_empty());
    Response::json(
        StatusCode::Ok,
        &json!({
            "requestId": request_id(&ctx),
            "x": x,
        }),
    )
}

async fn fail(_ctx: Context) -> ApiResult<Response> {
    error!("error endpoint called, forcing 500");
    Err(ApiError::internal("Forced error for testing"))
}

async fn random(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let q = ctx.query("q").unwrap_or_default();
    Ok(Response::json(StatusCode::Ok, &state.demo.random(q)))
}

async fn items(ctx: Context, total: u64) -> ApiResult<Response> {
    let query = PageQuery::from_raw(ctx.query("offset"), ctx.query("limit"), ctx.query("sort"));
    info!(
        offset = query.offset,
        limit = query.limit,
        sort = ?query.sort,
        "listing items"
    );

    let page = paginate(&synthetic_items(total), query);
    Ok(Response::json(
        StatusCode::Ok,
        &json!({
            "requestId": request_id(&ctx),
            "items": page.items,
            "pagination": page.info,
        }),
    ))
}
