pub use entity::{organizations, roles, sessions, users, Id};

pub mod error;
pub mod organization;
pub mod role;
pub mod session;
pub mod user;
