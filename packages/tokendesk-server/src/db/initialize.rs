use crate::db::migration::m00001_create_tables;
use crate::error::AppError;
use sea_orm::DbConn;
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use tracing::info;

/// 启动时执行全部迁移
pub(crate) async fn initial(db_cnn: &DbConn) -> Result<(), AppError> {
    Migrator::up(db_cnn, None).await?;
    info!("database schema is up to date");
    Ok(())
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m00001_create_tables::Migration)]
    }
}
