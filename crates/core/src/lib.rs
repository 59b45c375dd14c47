//! Core business logic for civic-connect.
//!
//! Every service method takes the authenticated [`Caller`] and checks it against
//! the access policy in [`access`] before touching the stores.

pub mod access;
pub mod services;
pub mod session;

pub use access::{Caller, Operation};
pub use services::*;
pub use session::{SessionClaims, SessionKeys};
