//! Repository layer for database operations.

mod complaint;
mod complaint_helper;
mod user;

pub use complaint::ComplaintRepository;
pub use complaint_helper::ComplaintHelperRepository;
pub use user::UserRepository;
