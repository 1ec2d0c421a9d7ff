pub mod auth;
pub mod parents;
pub mod roles;
pub mod schools;
pub mod students;
pub mod users;
