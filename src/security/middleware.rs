use std::sync::Arc;

use crate::{
    Method, Response, StatusCode,
    context::Context,
    http::REQUEST_ID_HEADER,
    middleware::{Middleware, Next, ResponseFuture},
};

/// Cross-origin policy for browser clients.
///
/// Requests without an `Origin`, or from an origin the policy refuses, go
/// through untouched. An admitted `OPTIONS` preflight is answered here with
/// `204` and never reaches the router. Other admitted requests run normally
/// and get the `Access-Control-*` headers added, including
/// `Access-Control-Expose-Headers: x-request-id`.
///
/// Browsers reject `*` on credentialed requests, so with credentials on the
/// caller's origin is echoed back (with `Vary: Origin`) instead.
///
/// ```
/// use demo_api::security::CorsMiddleware;
///
/// let cors = CorsMiddleware::for_origin("http://localhost:5173")
///     .allow_credentials(true)
///     .allow_header("Idempotency-Key");
/// ```
pub struct CorsMiddleware {
    policy: Arc<CorsPolicy>,
}

#[derive(Debug, Clone)]
struct CorsPolicy {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
}

impl CorsPolicy {
    // The value for `Access-Control-Allow-Origin`, or `None` when the origin is refused.
    fn allow_origin(&self, origin: &str) -> Option<String> {
        let wildcard = self.allowed_origins.iter().any(|o| o == "*");
        if wildcard && !self.allow_credentials {
            Some("*".to_owned())
        } else if wildcard || self.allowed_origins.iter().any(|o| o == origin) {
            Some(origin.to_owned())
        } else {
            None
        }
    }

    fn decorate(&self, response: &mut Response, allow_origin: &str) {
        response.add_header("Access-Control-Allow-Origin", allow_origin);
        response.add_header("Access-Control-Allow-Methods", self.allowed_methods.join(","));
        response.add_header("Access-Control-Allow-Headers", self.allowed_headers.join(", "));
        if self.allow_credentials {
            response.add_header("Access-Control-Allow-Credentials", "true");
        }
        if allow_origin != "*" {
            response.add_header("Vary", "Origin");
        }
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsMiddleware {
    /// Creates a permissive policy: every origin, the methods the API serves,
    /// and the request headers clients send (`Content-Type`, `Authorization`,
    /// `Idempotency-Key`, `X-Request-Id`).
    pub fn new() -> Self {
        Self::for_origin("*")
    }

    /// Creates a policy that admits only `origin`.
    pub fn for_origin(origin: impl Into<String>) -> Self {
        let methods = ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE", "OPTIONS"];
        let headers = [
            "Content-Type",
            "Authorization",
            "Idempotency-Key",
            "X-Request-Id",
        ];
        Self {
            policy: Arc::new(CorsPolicy {
                allowed_origins: vec![origin.into()],
                allowed_methods: methods.iter().map(|m| m.to_string()).collect(),
                allowed_headers: headers.iter().map(|h| h.to_string()).collect(),
                allow_credentials: false,
            }),
        }
    }

    /// Adds an allowed origin. Pass `"*"` to permit all origins.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.policy)
            .allowed_origins
            .push(origin.into());
        self
    }

    /// Adds a request header, ignoring case-insensitive duplicates.
    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        let policy = Arc::make_mut(&mut self.policy);
        if !policy
            .allowed_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&header))
        {
            policy.allowed_headers.push(header);
        }
        self
    }

    /// Emits `Access-Control-Allow-Credentials: true` when enabled.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        Arc::make_mut(&mut self.policy).allow_credentials = allow;
        self
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> ResponseFuture {
        let policy = Arc::clone(&self.policy);

        Box::pin(async move {
            let is_preflight = ctx.request().method() == &Method::Options;
            let allow_origin = ctx
                .request()
                .headers()
                .get("origin")
                .and_then(|origin| policy.allow_origin(origin));

            let Some(allow_origin) = allow_origin else {
                return next.run(ctx).await;
            };

            if is_preflight {
                let mut preflight =
                    Response::new(StatusCode::NoContent).header("Access-Control-Max-Age", "3600");
                policy.decorate(&mut preflight, &allow_origin);
                return preflight;
            }

            let mut response = next.run(ctx).await;
            policy.decorate(&mut response, &allow_origin);
            response.add_header("Access-Control-Expose-Headers", REQUEST_ID_HEADER);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::http::{Headers, Request};
    use crate::middleware::Pipeline;
    use crate::router::Router;

    fn request(method: &str, origin: Option<&str>) -> Request {
        let mut headers = Headers::new();
        if let Some(origin) = origin {
            headers.insert("Origin", origin);
        }
        Request::from_parts(method, "/api/articles", headers, Bytes::new())
    }

    fn service(cors: CorsMiddleware) -> crate::middleware::Service {
        let mut router = Router::new();
        router.get("/api/articles", |_ctx| async { Response::new(StatusCode::Ok) });
        Pipeline::new(router).layer(cors).build()
    }

    #[tokio::test]
    async fn no_origin_passes_through() {
        let res = service(CorsMiddleware::new())
            .handle(request("GET", None))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn preflight_short_circuits() {
        let cors = CorsMiddleware::for_origin("http://localhost:5173").allow_credentials(true);
        let res = service(cors)
            .handle(request("OPTIONS", Some("http://localhost:5173")))
            .await;

        assert_eq!(res.status(), StatusCode::NoContent);
        let h = res.headers();
        assert_eq!(h.get("access-control-allow-origin"), Some("http://localhost:5173"));
        assert_eq!(h.get("access-control-allow-credentials"), Some("true"));
        assert!(h.get("access-control-allow-headers").unwrap().contains("Idempotency-Key"));
        assert_eq!(h.get("vary"), Some("Origin"));
    }

    #[tokio::test]
    async fn foreign_origin_gets_no_headers() {
        let cors = CorsMiddleware::for_origin("http://localhost:5173");
        let res = service(cors)
            .handle(request("GET", Some("http://evil.example")))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(!res.headers().contains("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn actual_request_exposes_request_id() {
        let res = service(CorsMiddleware::new())
            .handle(request("GET", Some("http://anywhere")))
            .await;
        let h = res.headers();
        assert_eq!(h.get("access-control-allow-origin"), Some("*"));
        assert_eq!(h.get("access-control-expose-headers"), Some("x-request-id"));
        assert!(!h.contains("vary"));
    }

    #[tokio::test]
    async fn wildcard_with_credentials_echoes_origin() {
        let cors = CorsMiddleware::new().allow_credentials(true);
        let res = service(cors)
            .handle(request("GET", Some("http://app.local")))
            .await;
        assert_eq!(
            res.headers().get("access-control-allow-origin"),
            Some("http://app.local")
        );
    }

    #[test]
    fn allow_header_deduplicates() {
        let cors = CorsMiddleware::new()
            .allow_header("x-request-id")
            .allow_header("X-Trace");
        assert_eq!(cors.policy.allowed_headers.len(), 5);
    }
}
