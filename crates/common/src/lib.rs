//! Common utilities and shared types for civic-connect.
//!
//! This crate provides foundational components used across all civic-connect crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and complaint codes via [`IdGenerator`]
//! - **Storage**: Image storage backends for report photos
//!
//! # Example
//!
//! ```no_run
//! use civic_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     println!("{} on port {}", id_gen.complaint_code(), config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{IdGenerator, complaint_code_at};
pub use storage::{LocalStorage, StorageBackend, UploadedFile};
