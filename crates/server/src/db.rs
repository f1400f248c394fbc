use sea_orm::{Database, DatabaseConnection};
use tutorium_migration::{Migrator, MigratorTrait};

pub async fn init_pool_and_migrate(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(database_url).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}
