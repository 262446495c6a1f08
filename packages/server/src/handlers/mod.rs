pub mod auth;
pub mod wiki;
