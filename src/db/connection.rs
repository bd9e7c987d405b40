use std::time::Duration;

use diesel::{
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection},
    QueryResult, SqliteConnection,
};
use r2d2::{Pool, PooledConnection};

use crate::{config::DatabaseSettings, error::BoardError};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS boards (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        name TEXT NOT NULL,
        parent_id INTEGER NULL
            REFERENCES boards(id) ON DELETE CASCADE ON UPDATE NO ACTION,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_boards_parent_id ON boards(parent_id);
"#;

/// Pragmas applied to every pooled connection. SQLite keeps foreign key
/// enforcement off unless each connection asks for it, and the cascading
/// delete of a subtree depends on it.
#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

fn init_pool(settings: &DatabaseSettings) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<SqliteConnection>::new(&settings.url);
    Pool::builder()
        .max_size(settings.pool_size)
        .connection_customizer(Box::new(ConnectionPragmas {
            busy_timeout: settings.busy_timeout,
        }))
        .build(manager)
}

pub fn init_schema(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(CREATE_SCHEMA)
}

/// Opens the pool and makes sure the `boards` table exists.
pub fn establish_connection(settings: &DatabaseSettings) -> Result<DbPool, BoardError> {
    let pool = init_pool(settings)?;
    let mut db_connection = pool.get()?;
    init_schema(&mut db_connection)?;

    tracing::info!(
        database = %settings.url,
        pool_size = settings.pool_size,
        "Database ready"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::{sql_query, sql_types::Integer, QueryableByName, RunQueryDsl};
    use tempfile::TempDir;

    #[derive(QueryableByName)]
    struct PragmaValue {
        #[diesel(sql_type = Integer)]
        foreign_keys: i32,
    }

    fn settings_in(dir: &TempDir) -> DatabaseSettings {
        DatabaseSettings {
            url: dir.path().join("boards.db").to_string_lossy().into_owned(),
            pool_size: 2,
            busy_timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn pooled_connections_enforce_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let pool = establish_connection(&settings_in(&dir)).unwrap();
        let mut conn = pool.get().unwrap();

        let value: PragmaValue = sql_query("PRAGMA foreign_keys")
            .get_result(&mut *conn)
            .unwrap();
        assert_eq!(value.foreign_keys, 1);
    }

    #[test]
    fn schema_bootstrap_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        establish_connection(&settings).unwrap();
        let pool = establish_connection(&settings).unwrap();

        let mut conn = pool.get().unwrap();
        init_schema(&mut conn).unwrap();
    }
}
