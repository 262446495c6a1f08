use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::cooldown::Cooldown;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub cooldown: Cooldown,
}
