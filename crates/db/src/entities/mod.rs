//! Database entities.

pub mod complaint;
pub mod complaint_helper;
pub mod user;

pub use complaint::Entity as Complaint;
pub use complaint_helper::Entity as ComplaintHelper;
pub use user::Entity as User;
