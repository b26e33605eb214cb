//! Database engine kinds.

use serde::{Deserialize, Serialize};

/// SQL engine behind an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Engine {
    /// MySQL.
    Mysql,
    /// TiDB.
    Tidb,
    /// MariaDB.
    Mariadb,
    /// OceanBase (MySQL mode).
    Oceanbase,
    /// Microsoft SQL Server.
    Mssql,
    /// PostgreSQL.
    Postgres,
    /// Oracle.
    Oracle,
    /// Snowflake.
    Snowflake,
    /// SQLite.
    Sqlite,
    /// ClickHouse.
    Clickhouse,
}

impl Engine {
    /// All known engines.
    pub const ALL: [Engine; 10] = [
        Engine::Mysql,
        Engine::Tidb,
        Engine::Mariadb,
        Engine::Oceanbase,
        Engine::Mssql,
        Engine::Postgres,
        Engine::Oracle,
        Engine::Snowflake,
        Engine::Sqlite,
        Engine::Clickhouse,
    ];

    /// Lowercase name used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Mysql => "mysql",
            Engine::Tidb => "tidb",
            Engine::Mariadb => "mariadb",
            Engine::Oceanbase => "oceanbase",
            Engine::Mssql => "mssql",
            Engine::Postgres => "postgres",
            Engine::Oracle => "oracle",
            Engine::Snowflake => "snowflake",
            Engine::Sqlite => "sqlite",
            Engine::Clickhouse => "clickhouse",
        }
    }

    /// Whether the engine speaks the MySQL dialect for table comments.
    pub fn is_mysql_family(&self) -> bool {
        matches!(
            self,
            Engine::Mysql | Engine::Tidb | Engine::Mariadb | Engine::Oceanbase
        )
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Engine::ALL
            .iter()
            .copied()
            .find(|engine| engine.as_str() == lower)
            .ok_or_else(|| format!("unknown engine: {}", s))
    }
}
