use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::boards;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = boards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Board {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = boards)]
pub struct NewBoard<'a> {
    pub name: &'a str,
    pub parent_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Re-points a board. `parent_id: None` promotes it to a root, so the
/// field is written even when null.
#[derive(AsChangeset)]
#[diesel(table_name = boards)]
#[diesel(treat_none_as_null = true)]
pub struct BoardParentChangeSet {
    pub parent_id: Option<i32>,
    pub updated_at: NaiveDateTime,
}
