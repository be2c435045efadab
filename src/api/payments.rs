use std::sync::Arc;

use serde_json::json;

use super::with_state;
use crate::app::AppState;
use crate::context::Context;
use crate::error::ApiResult;
use crate::http::{IDEMPOTENCY_KEY_HEADER, Response, StatusCode};
use crate::payments::NewPayment;
use crate::router::Router;

pub(super) fn routes(router: &mut Router, state: &Arc<AppState>) {
    router.post("/payments", with_state(state, create));
    router.post("/payments/debug/all", with_state(state, all));
    router.post("/payments/debug/clear", with_state(state, clear));
}

async fn create(state: Arc<AppState>, ctx: Context) -> ApiResult<Response> {
    let key = ctx.request().headers().get(IDEMPOTENCY_KEY_HEADER);
    // An empty body is accepted and records a zero amount.
    let input: NewPayment = if ctx.request().body().is_empty() {
        NewPayment::default()
    } else {
        ctx.json()?
    };

    let payment = state.payments.create(key, input)?;
    Ok(Response::json(StatusCode::Created, &payment))
}

async fn all(state: Arc<AppState>, _ctx: Context) -> ApiResult<Response> {
    let payments = state.payments.all();
    Ok(Response::json(
        StatusCode::Created,
        &json!({
            "count": payments.len(),
            "payments": payments,
        }),
    ))
}

async fn clear(state: Arc<AppState>, _ctx: Context) -> ApiResult<Response> {
    let count = state.payments.clear();
    Ok(Response::json(
        StatusCode::Created,
        &json!({
            "message": format!("Cleared {count} stored payments"),
            "count": count,
        }),
    ))
}
