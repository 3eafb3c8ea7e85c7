pub mod access;
pub mod inventory;
pub mod photo;
pub mod session;
pub mod users;
