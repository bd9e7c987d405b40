use diesel::{prelude::*, result::Error, SqliteConnection};

use crate::db::{
    models::{Board, BoardParentChangeSet, NewBoard},
    schema::boards,
};

pub trait FindBoard {
    fn find(board_id: i32, db_connection: &mut SqliteConnection) -> Result<Option<Board>, Error>;

    /// `None` when the board does not exist, `Some(None)` for a root.
    fn find_parent_id(
        board_id: i32,
        db_connection: &mut SqliteConnection,
    ) -> Result<Option<Option<i32>>, Error>;

    fn find_roots(db_connection: &mut SqliteConnection) -> Result<Vec<Board>, Error>;

    fn find_children(
        parent_id: i32,
        db_connection: &mut SqliteConnection,
    ) -> Result<Vec<Board>, Error>;

    fn find_child_ids(
        parent_ids: &[i32],
        db_connection: &mut SqliteConnection,
    ) -> Result<Vec<i32>, Error>;

    fn count(db_connection: &mut SqliteConnection) -> Result<i64, Error>;
}

impl FindBoard for Board {
    fn find(board_id: i32, db_connection: &mut SqliteConnection) -> Result<Option<Board>, Error> {
        boards::table
            .find(board_id)
            .select(Board::as_select())
            .first(db_connection)
            .optional()
    }

    fn find_parent_id(
        board_id: i32,
        db_connection: &mut SqliteConnection,
    ) -> Result<Option<Option<i32>>, Error> {
        boards::table
            .find(board_id)
            .select(boards::parent_id)
            .first(db_connection)
            .optional()
    }

    fn find_roots(db_connection: &mut SqliteConnection) -> Result<Vec<Board>, Error> {
        boards::table
            .filter(boards::parent_id.is_null())
            .order(boards::id.asc())
            .select(Board::as_select())
            .load(db_connection)
    }

    fn find_children(
        parent_id: i32,
        db_connection: &mut SqliteConnection,
    ) -> Result<Vec<Board>, Error> {
        boards::table
            .filter(boards::parent_id.eq(parent_id))
            .order(boards::id.asc())
            .select(Board::as_select())
            .load(db_connection)
    }

    fn find_child_ids(
        parent_ids: &[i32],
        db_connection: &mut SqliteConnection,
    ) -> Result<Vec<i32>, Error> {
        boards::table
            .filter(boards::parent_id.eq_any(parent_ids))
            .order(boards::id.asc())
            .select(boards::id)
            .load(db_connection)
    }

    fn count(db_connection: &mut SqliteConnection) -> Result<i64, Error> {
        boards::table.count().get_result(db_connection)
    }
}

pub trait CreateBoard {
    fn create(new_board: NewBoard<'_>, db_connection: &mut SqliteConnection)
        -> Result<Board, Error>;
}

impl CreateBoard for Board {
    fn create(
        new_board: NewBoard<'_>,
        db_connection: &mut SqliteConnection,
    ) -> Result<Board, Error> {
        diesel::insert_into(boards::table)
            .values(&new_board)
            .returning(Board::as_returning())
            .get_result(db_connection)
    }
}

pub trait MoveBoard {
    fn reparent(
        board_id: i32,
        change_set: BoardParentChangeSet,
        db_connection: &mut SqliteConnection,
    ) -> Result<Board, Error>;
}

impl MoveBoard for Board {
    fn reparent(
        board_id: i32,
        change_set: BoardParentChangeSet,
        db_connection: &mut SqliteConnection,
    ) -> Result<Board, Error> {
        diesel::update(boards::table.find(board_id))
            .set(&change_set)
            .returning(Board::as_returning())
            .get_result(db_connection)
    }
}

pub trait DeleteBoard {
    /// Deletes one row. Descendants go with it through the cascading
    /// foreign key.
    fn delete(board_id: i32, db_connection: &mut SqliteConnection) -> Result<Board, Error>;
}

impl DeleteBoard for Board {
    fn delete(board_id: i32, db_connection: &mut SqliteConnection) -> Result<Board, Error> {
        let result: Vec<Board> = diesel::delete(boards::table.find(board_id))
            .returning(Board::as_returning())
            .get_results(db_connection)?;

        result.into_iter().next().ok_or(Error::NotFound)
    }
}
