//! Fixtures shared by the unit tests.

use std::time::Duration;

use chrono::Utc;
use diesel::{connection::SimpleConnection, Connection, SqliteConnection};
use tempfile::TempDir;

use super::{
    connection::{establish_connection, init_schema, DbPool},
    models::{Board, NewBoard},
    repos::board::CreateBoard,
};
use crate::config::DatabaseSettings;

pub fn memory_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
    init_schema(&mut conn).unwrap();
    conn
}

/// A pool over a fresh database file. Keep the `TempDir` alive for the
/// duration of the test.
pub fn temp_pool() -> (DbPool, TempDir) {
    let dir = TempDir::new().unwrap();
    let settings = DatabaseSettings {
        url: dir.path().join("boards.db").to_string_lossy().into_owned(),
        pool_size: 4,
        busy_timeout: Duration::from_secs(5),
    };
    (establish_connection(&settings).unwrap(), dir)
}

pub fn insert_board(name: &str, parent_id: Option<i32>, conn: &mut SqliteConnection) -> Board {
    let now = Utc::now().naive_utc();
    Board::create(
        NewBoard {
            name,
            parent_id,
            created_at: now,
            updated_at: now,
        },
        conn,
    )
    .unwrap()
}

/// Inserts a straight line of `levels` boards and returns them root first.
pub fn insert_chain(levels: usize, conn: &mut SqliteConnection) -> Vec<Board> {
    let mut chain: Vec<Board> = Vec::with_capacity(levels);
    for level in 0..levels {
        let parent_id = chain.last().map(|board| board.id);
        chain.push(insert_board(&format!("Level {}", level), parent_id, conn));
    }
    chain
}
