//! JSON bodies exchanged over `/api`. Shared by the HTTP controllers and
//! the terminal client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::models::Board, services::tree::BoardTree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: i32,
    pub name: String,
}

impl From<&Board> for ParentRef {
    fn from(board: &Board) -> Self {
        ParentRef {
            id: board.id,
            name: board.name.clone(),
        }
    }
}

/// A board as the API returns it. `children` is only present in list
/// responses. Timestamps are stored naive in UTC and sent with a `Z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BoardView>>,
}

impl BoardView {
    pub fn new(board: Board, parent: Option<&Board>) -> Self {
        BoardView {
            id: board.id,
            name: board.name,
            parent_id: board.parent_id,
            parent: parent.map(ParentRef::from),
            created_at: board.created_at.and_utc(),
            updated_at: board.updated_at.and_utc(),
            children: None,
        }
    }

    pub fn from_tree(tree: BoardTree, parent: Option<&Board>) -> Self {
        let BoardTree { board, children } = tree;
        let children = children
            .into_iter()
            .map(|child| BoardView::from_tree(child, Some(&board)))
            .collect();

        BoardView {
            children: Some(children),
            ..BoardView::new(board, parent)
        }
    }

    pub fn children(&self) -> &[BoardView] {
        self.children.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i32>,
}

/// `newParentId` null or absent moves the board to the root level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBoardRequest {
    #[serde(default)]
    pub new_parent_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}
