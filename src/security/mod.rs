//! Who may call what: bearer-token authentication and role checks in
//! [`auth`], browser cross-origin rules in [`CorsMiddleware`].

pub mod auth;
mod middleware;

pub use middleware::CorsMiddleware;
