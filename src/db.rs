use anyhow::{Result, bail};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend};

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Apply the SQL files in `migrations/` (embedded at compile time) to a Postgres database.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    if backend != DbBackend::Postgres {
        bail!("migrations are written for Postgres, connected to {backend:?}");
    }
    sqlx::migrate!("./migrations")
        .run(conn.get_postgres_connection_pool())
        .await?;
    Ok(())
}
