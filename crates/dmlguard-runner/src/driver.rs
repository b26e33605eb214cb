//! Database driver boundary.

use async_trait::async_trait;

use dmlguard_core::{Database, Instance, Result};

/// A live administrative connection to one database.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, statement: &str) -> Result<u64>;

    /// Release the connection.
    async fn close(&self) -> Result<()>;
}

/// Opens administrative connections.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Connect to `database` through `instance`.
    async fn admin_driver(&self, instance: &Instance, database: &Database)
        -> Result<Box<dyn Driver>>;
}
