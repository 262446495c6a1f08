pub mod auth;
pub mod shared;
pub mod wiki;
