//! Application assembly: shared state, the middleware stack and the routes.

use std::sync::Arc;

use tracing::info;

use crate::api;
use crate::articles::ArticleStore;
use crate::config::Config;
use crate::demo::DemoService;
use crate::http::{Request, Response};
use crate::middleware::{LoggerMiddleware, Pipeline, RequestIdMiddleware, Service};
use crate::payments::PaymentService;
use crate::security::CorsMiddleware;
use crate::security::auth::TokenService;
use crate::users::UserStore;

/// Everything handlers share. Each collection guards itself.
pub struct AppState {
    pub articles: ArticleStore,
    pub users: UserStore,
    pub tokens: Arc<TokenService>,
    pub payments: PaymentService,
    pub demo: DemoService,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let users = UserStore::new();
        if config.seed_users {
            users.seed();
        }
        Self {
            articles: ArticleStore::seeded(),
            users,
            tokens: Arc::new(TokenService::new(
                config.access_token_ttl(),
                config.refresh_token_ttl(),
            )),
            payments: PaymentService::new(),
            demo: DemoService::new(config.cache_ttl()),
        }
    }
}

/// The assembled application.
///
/// Layers, outermost first: request id, logger, CORS, then the router.
#[derive(Clone)]
pub struct App {
    state: Arc<AppState>,
    service: Service,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let state = Arc::new(AppState::new(config));
        let router = api::routes(&state);
        info!(routes = router.len(), "route table built");

        let service = Pipeline::new(router)
            .layer(RequestIdMiddleware)
            .layer(LoggerMiddleware)
            .layer(CorsMiddleware::for_origin(config.cors_origin.clone()).allow_credentials(true))
            .build();

        Self { state, service }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// The middleware stack, for handing to a [`Server`](crate::Server).
    pub fn service(&self) -> Service {
        self.service.clone()
    }

    /// Runs one request through the application.
    pub async fn handle(&self, request: Request) -> Response {
        self.service.handle(request).await
    }
}
