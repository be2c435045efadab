//! Route table: method plus path pattern plus access rule, mapped to a handler.
//!
//! Patterns are `/`-separated segments. A segment starting with `:` captures
//! whatever the request has in that position, so `/users/:id` matches
//! `/users/42` with `id = "42"`. Segment counts must agree exactly, and a
//! trailing slash on either side is ignored.
//!
//! Lookup walks the table in registration order and takes the first hit.
//! Register literal routes such as `/users/profile` ahead of `/users/:id`.

use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::error::{ApiError, ApiResult};
use crate::middleware::ResponseFuture;
use crate::security::auth::{Authenticator, Role, bearer_token};
use crate::{Method, Request, Response};

/// Conversion from a handler's return value into a [`Response`].
///
/// The correlation id is passed along so that error bodies can include it.
pub trait IntoResponse {
    fn into_response(self, request_id: Option<&str>) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self, _request_id: Option<&str>) -> Response {
        self
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: IntoResponse,
{
    fn into_response(self, request_id: Option<&str>) -> Response {
        match self {
            Ok(value) => value.into_response(request_id),
            Err(err) => err.into_response(request_id),
        }
    }
}

/// Boxed handler as stored in the table.
pub type Handler = Arc<dyn Fn(Context) -> ResponseFuture + Send + Sync + 'static>;

/// Anything callable as `async fn(Context) -> impl IntoResponse`.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> ResponseFuture;
}

impl<T, F, R> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, ctx: Context) -> ResponseFuture {
        let request_id = ctx.request_id().map(str::to_owned);
        let future = (self)(ctx);
        Box::pin(async move { future.await.into_response(request_id.as_deref()) })
    }
}

/// Who may call a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone.
    Public,
    /// Any caller presenting a valid bearer token.
    Authenticated,
    /// A caller with a valid bearer token and exactly this role.
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// Compiled route path.
#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<Segment>,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let segments = segments(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Capture(name.to_owned()),
                None => Segment::Literal(s.to_owned()),
            })
            .collect();
        Self { segments }
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut parts = segments(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if lit != part => return None,
                Segment::Literal(_) => {}
                Segment::Capture(name) => params.insert(name.clone(), part.to_owned()),
            }
        }
        parts.next().is_none().then_some(params)
    }
}

/// One entry of the route table.
pub struct Route {
    method: Method,
    path: String,
    pattern: Pattern,
    access: Access,
    handler: Handler,
}

impl Route {
    fn new(method: Method, path: String, handler: Handler) -> Self {
        Self {
            method,
            pattern: Pattern::parse(&path),
            path,
            access: Access::Public,
            handler,
        }
    }

    /// Require a valid bearer token.
    pub fn authenticated(&mut self) -> &mut Self {
        self.access = Access::Authenticated;
        self
    }

    /// Require a valid bearer token whose holder has `role`.
    pub fn require_role(&mut self, role: Role) -> &mut Self {
        self.access = Access::Role(role);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn access(&self) -> Access {
        self.access
    }

    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        if &self.method != method {
            return None;
        }
        self.pattern.matches(path)
    }
}

/// Dispatches requests to handlers and enforces each route's [`Access`].
///
/// An unmatched request gets a JSON `404`. Protected routes ask the
/// installed [`Authenticator`] about the bearer token: no token or a bad one
/// is `401`, the wrong role is `403`.
///
/// ```no_run
/// use demo_api::{Response, StatusCode};
/// use demo_api::router::Router;
/// use demo_api::security::auth::Role;
///
/// let mut router = Router::with_prefix("/api");
///
/// router.get("/health", |_ctx| async { Response::new(StatusCode::Ok) });
/// router
///     .get("/users", |_ctx| async { Response::new(StatusCode::Ok) })
///     .require_role(Role::Admin);
/// ```
#[derive(Default)]
pub struct Router {
    prefix: String,
    routes: Vec<Route>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl Router {
    /// Router with no prefix.
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Router that mounts every route under `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_owned(),
            routes: Vec::new(),
            authenticator: None,
        }
    }

    /// Installs the authenticator consulted by protected routes.
    pub fn set_authenticator(&mut self, authenticator: Arc<dyn Authenticator>) {
        self.authenticator = Some(authenticator);
    }

    pub fn get(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Get, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Post, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Put, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Patch, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl IntoHandler) -> &mut Route {
        self.add_route(Method::Delete, path, handler)
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) -> &mut Route {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        let index = self.routes.len();
        self.routes
            .push(Route::new(method, format!("{}{path}", self.prefix), handler));
        &mut self.routes[index]
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The route table in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Dispatch `request` with a fresh context. See [`dispatch`](Self::dispatch).
    pub async fn route(&self, request: Request) -> Response {
        self.dispatch(Context::new(request)).await
    }

    /// Dispatch the request in `ctx` to the first matching route.
    pub async fn dispatch(&self, mut ctx: Context) -> Response {
        let request_id = ctx.request_id().map(str::to_owned);

        let matched = self.routes.iter().find_map(|route| {
            route
                .matches(ctx.request().method(), ctx.request().path())
                .map(|params| (route, params))
        });

        let Some((route, params)) = matched else {
            let message = format!(
                "Cannot {} {}",
                ctx.request().method(),
                ctx.request().path()
            );
            return ApiError::not_found("Route", message).into_response(request_id.as_deref());
        };

        ctx.set_params(params);

        if let Err(err) = self.authorize(route.access, &mut ctx) {
            return err.into_response(request_id.as_deref());
        }

        (route.handler)(ctx).await
    }

    // Enforce the route's access requirement, storing the principal in the context.
    fn authorize(&self, access: Access, ctx: &mut Context) -> ApiResult<()> {
        if access == Access::Public {
            return Ok(());
        }

        let authenticator = self
            .authenticator
            .as_ref()
            .ok_or_else(|| ApiError::internal("authentication is not configured"))?;

        let token = bearer_token(ctx.request().headers())
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
        let principal = authenticator.authenticate(token)?;

        if let Access::Role(role) = access {
            if principal.role != role {
                return Err(ApiError::forbidden("Forbidden resource"));
            }
        }

        ctx.extensions_mut().insert(principal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use uuid::Uuid;

    use super::*;
    use crate::StatusCode;
    use crate::http::Headers;
    use crate::security::auth::Principal;

    fn request(method: &str, path: &str) -> Request {
        Request::from_parts(method, path, Headers::new(), Bytes::new())
    }

    fn with_token(method: &str, path: &str, token: &str) -> Request {
        let mut headers = Headers::new();
        headers.insert("Authorization", format!("Bearer {token}"));
        Request::from_parts(method, path, headers, Bytes::new())
    }

    // Accepts "admin" and "user" as tokens for the matching role.
    struct FixedTokens;

    impl Authenticator for FixedTokens {
        fn authenticate(&self, token: &str) -> ApiResult<Principal> {
            let role = match token {
                "admin" => Role::Admin,
                "user" => Role::User,
                _ => return Err(ApiError::unauthorized("Invalid token")),
            };
            Ok(Principal {
                user_id: Uuid::nil(),
                email: format!("{token}@test.com"),
                role,
            })
        }
    }

    fn protected_router() -> Router {
        let mut router = Router::with_prefix("/api");
        router.set_authenticator(Arc::new(FixedTokens));
        router
            .get("/users/profile", |ctx: Context| async move {
                let email = ctx.principal().map(|p| p.email.clone()).unwrap_or_default();
                Response::new(StatusCode::Ok).body(email)
            })
            .authenticated();
        router
            .get("/users", |_ctx| async { Response::new(StatusCode::Ok) })
            .require_role(Role::Admin);
        router
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        assert!(Pattern::parse("/api/articles/").matches("/api/articles").is_some());
        assert!(Pattern::parse("/api/articles").matches("/api/articles/").is_some());
        assert!(Pattern::parse("/").matches("/").is_some());
        assert!(Pattern::parse("/api/articles").matches("/api/users").is_none());
    }

    #[test]
    fn captures_are_named() {
        let pattern = Pattern::parse("/api/articles/:id");
        assert_eq!(pattern.segments[2], Segment::Capture("id".into()));

        let params = pattern.matches("/api/articles/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn segment_counts_must_agree() {
        let pattern = Pattern::parse("/users/:id");
        assert!(pattern.matches("/users").is_none());
        assert!(pattern.matches("/users/42/extra").is_none());
        assert!(pattern.matches("/posts/42").is_none());
    }

    #[test]
    fn prefix_is_prepended() {
        let mut router = Router::with_prefix("/api/");
        router.get("/articles", |_ctx| async { Response::new(StatusCode::Ok) });
        let paths: Vec<_> = router.routes().map(Route::path).collect();
        assert_eq!(paths, vec!["/api/articles"]);
        assert_eq!(router.len(), 1);
    }

    #[tokio::test]
    async fn unmatched_returns_json_404() {
        let router = Router::new();
        let res = router.route(request("GET", "/nowhere")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(res.body_json().unwrap()["message"], "Cannot GET /nowhere");
    }

    #[tokio::test]
    async fn method_must_match() {
        let mut router = Router::new();
        router.get("/hello", |_ctx| async { Response::new(StatusCode::Ok) });
        let res = router.route(request("POST", "/hello")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let mut router = Router::new();
        router.get("/users/profile", |_ctx| async { Response::new(StatusCode::Ok) });
        router.get("/users/:id", |_ctx| async { Response::new(StatusCode::Created) });

        let res = router.route(request("GET", "/users/profile")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let res = router.route(request("GET", "/users/7")).await;
        assert_eq!(res.status(), StatusCode::Created);
    }

    #[tokio::test]
    async fn handler_errors_become_responses() {
        let mut router = Router::new();
        router.get("/fail", |_ctx| async {
            Err::<Response, _>(ApiError::conflict("already exists"))
        });
        let res = router.route(request("GET", "/fail")).await;
        assert_eq!(res.status(), StatusCode::Conflict);
        assert_eq!(res.body_json().unwrap()["message"], "already exists");
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401() {
        let res = protected_router()
            .route(request("GET", "/api/users/profile"))
            .await;
        assert_eq!(res.status(), StatusCode::Unauthorized);
    }

    #[tokio::test]
    async fn protected_route_with_bad_token_is_401() {
        let res = protected_router()
            .route(with_token("GET", "/api/users/profile", "forged"))
            .await;
        assert_eq!(res.status(), StatusCode::Unauthorized);
    }

    #[tokio::test]
    async fn principal_is_available_to_handler() {
        let res = protected_router()
            .route(with_token("GET", "/api/users/profile", "user"))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.body_ref(), b"user@test.com");
    }

    #[tokio::test]
    async fn wrong_role_is_403() {
        let router = protected_router();
        let res = router.route(with_token("GET", "/api/users", "user")).await;
        assert_eq!(res.status(), StatusCode::Forbidden);
        let res = router.route(with_token("GET", "/api/users", "admin")).await;
        assert_eq!(res.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn protected_route_without_authenticator_is_500() {
        let mut router = Router::new();
        router
            .get("/secret", |_ctx| async { Response::new(StatusCode::Ok) })
            .authenticated();
        let res = router.route(with_token("GET", "/secret", "admin")).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
    }
}
