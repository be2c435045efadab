//! # demo-api
//!
//! A demonstration CRUD API (articles, users, demo utilities and idempotent
//! payments) served by a small async HTTP/1.1 stack.
//!
//! ## Running
//!
//! ```rust,no_run
//! use demo_api::{App, Server};
//! use demo_api::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let app = App::new(&config);
//!     let server = Server::bind(config.addr()).await?;
//!     server.run(app.service()).await?;
//!     Ok(())
//! }
//! ```

// HTTP stack
pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

// Reusable utilities
pub mod cache;
pub mod pagination;

// Domain
pub mod articles;
pub mod demo;
pub mod payments;
pub mod users;

// Application
pub mod api;
pub mod app;
pub mod config;

// Convenience re-exports
pub use app::{App, AppState};
pub use error::{ApiError, ApiResult};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
