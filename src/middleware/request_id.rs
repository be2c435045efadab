use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use super::{Middleware, Next, ResponseFuture};
use crate::context::{Context, RequestId};
use crate::http::REQUEST_ID_HEADER;

/// Assigns every request a correlation id.
///
/// The inbound `x-request-id` header is reused when present and non-blank;
/// otherwise a fresh UUID v4 is generated. The id is stored in the context
/// before any later layer runs, echoed on the response, and recorded on a
/// `request` span that wraps the rest of the pipeline so every log line for
/// the request carries it.
///
/// Register it first so that every other layer runs inside the span.
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    fn resolve(ctx: &Context) -> String {
        ctx.request()
            .headers()
            .get_non_empty(REQUEST_ID_HEADER)
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

impl Middleware for RequestIdMiddleware {
    fn handle(&self, mut ctx: Context, next: Next) -> ResponseFuture {
        let request_id = Self::resolve(&ctx);
        ctx.extensions_mut().insert(RequestId(request_id.clone()));

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %ctx.request().method(),
            path = %ctx.request().path(),
        );

        Box::pin(
            async move {
                debug!("request received");
                let mut response = next.run(ctx).await;
                response.set_header(REQUEST_ID_HEADER, request_id);
                response
            }
            .instrument(span),
        )
    }
}
