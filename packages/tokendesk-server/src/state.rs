use crate::admin::templates::AdminTemplates;
use crate::bootstrap::config::AppConfig;
use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) db: DatabaseConnection,
    pub(crate) config: AppConfig,
    pub(crate) templates: AdminTemplates,
}
