pub mod auth;
pub mod pins;
pub mod schools;
pub mod users;
