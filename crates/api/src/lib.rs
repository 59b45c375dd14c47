//! HTTP API layer for civic-connect.
//!
//! - **Endpoints**: auth, profile, reports, helpers, analytics, export, uploads
//! - **Extractors**: bearer-token caller, JSON bodies with uniform error replies
//! - **Middleware**: session token verification
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{app, router};
pub use middleware::{AppState, auth_middleware};
