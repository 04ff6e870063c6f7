//! Relational store connection and schema management.

use std::collections::HashSet;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr,
    EntityTrait, Statement,
};
use sea_orm_migration::{seaql_migrations, MigratorTrait};

use common::DatabaseConfig;

use super::migrations::Migrator;

/// Pooled connection to the users store.
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Open the pool, bring the schema up to date and verify the store answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let db = Self::connect_without_migrations(config).await?;

        Migrator::up(&db.connection, None).await?;
        db.ping().await?;
        tracing::info!(
            max_connections = config.max_connections,
            "Database ready, migrations applied"
        );

        Ok(db)
    }

    /// Open the pool only. Used by the `migrate` subcommands.
    pub async fn connect_without_migrations(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .sqlx_logging(false);

        let connection = SeaDatabase::connect(options).await?;
        Ok(Self { connection })
    }

    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await
    }

    /// Revert the most recent migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// Every known migration paired with whether it has been applied.
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        let applied: HashSet<String> = seaql_migrations::Entity::find()
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect())
    }

    /// Drop everything and reapply all migrations.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), DbErr> {
        let backend = self.connection.get_database_backend();
        self.connection
            .execute(Statement::from_string(backend, "SELECT 1".to_owned()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        }
    }

    #[tokio::test]
    async fn test_connect_applies_schema_and_answers_ping() {
        let db = Database::connect(&sqlite_config()).await.unwrap();

        db.ping().await.unwrap();
        let status = db.migration_status().await.unwrap();
        assert!(!status.is_empty());
        assert!(status.iter().all(|(_, applied)| *applied));
    }

    #[tokio::test]
    async fn test_rollback_then_status() {
        let db = Database::connect(&sqlite_config()).await.unwrap();

        db.rollback_migration().await.unwrap();

        let status = db.migration_status().await.unwrap();
        assert!(status.iter().all(|(_, applied)| !*applied));
    }

    #[tokio::test]
    async fn test_migrate_after_plain_connect() {
        let db = Database::connect_without_migrations(&sqlite_config())
            .await
            .unwrap();

        db.ping().await.unwrap();
        db.run_migrations().await.unwrap();
        assert!(db
            .migration_status()
            .await
            .unwrap()
            .iter()
            .all(|(_, applied)| *applied));
    }
}
