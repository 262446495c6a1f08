pub mod role;
pub mod role_permission;
pub mod statistic;
pub mod user;
pub mod wiki_article;
