//! Route handlers and the application's route table.
//!
//! Handlers are plain `async fn(Arc<AppState>, Context) -> ApiResult<Response>`;
//! [`with_state`] binds the shared state so they fit the router.

use std::sync::Arc;

use crate::app::AppState;
use crate::context::Context;
use crate::router::{IntoHandler, IntoResponse, Router};

mod articles;
mod auth;
mod demo;
mod payments;
mod users;

/// Every route is mounted under this prefix.
pub const API_PREFIX: &str = "/api";

/// Builds the full route table. Literal paths are registered ahead of
/// parameterized siblings (`/users/profile` before `/users/:id`).
pub fn routes(state: &Arc<AppState>) -> Router {
    let mut router = Router::with_prefix(API_PREFIX);
    router.set_authenticator(state.tokens.clone());

    auth::routes(&mut router, state);
    articles::routes(&mut router, state);
    demo::routes(&mut router, state);
    payments::routes(&mut router, state);
    users::routes(&mut router, state);

    router
}

/// Adapts a handler that takes the shared state into a router handler.
pub(crate) fn with_state<H, F, R>(state: &Arc<AppState>, handler: H) -> impl IntoHandler
where
    H: Fn(Arc<AppState>, Context) -> F + Send + Sync + 'static,
    F: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let state = Arc::clone(state);
    move |ctx: Context| handler(Arc::clone(&state), ctx)
}

/// The correlation id for JSON bodies. Always set once the request-id
/// middleware has run.
pub(crate) fn request_id(ctx: &Context) -> &str {
    ctx.request_id().unwrap_or_default()
}
