//! Walks over the `parent_id` adjacency relation.
//!
//! Upward walks follow one parent link per query; downward walks fetch
//! one level (or one node's children) per query. Each walk remembers the
//! ids it has visited, so a corrupted, cyclic set of links surfaces as
//! [`BoardError::CorruptHierarchy`] instead of looping forever. Depth on
//! its own is never treated as corruption.

use std::collections::HashSet;

use diesel::SqliteConnection;

use crate::{
    db::{models::Board, repos::board::FindBoard},
    error::{BoardError, Result},
};

/// Levels allowed from a root down to its deepest leaf, inclusive.
pub const MAX_LEVELS: usize = 10;

/// Deepest depth a board may have. Roots sit at depth 0.
pub const MAX_DEPTH: usize = MAX_LEVELS - 1;

/// Bound on the ids bound into a single `IN (...)` query.
const MAX_IDS_PER_QUERY: usize = 500;

/// A board with its whole subtree loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardTree {
    pub board: Board,
    pub children: Vec<BoardTree>,
}

impl BoardTree {
    /// Number of boards in the tree, root included.
    #[cfg(test)]
    fn size(&self) -> usize {
        1 + self.children.iter().map(BoardTree::size).sum::<usize>()
    }
}

/// Ids from `board` up to its root, `board` first.
pub fn ancestor_chain(board: &Board, db_connection: &mut SqliteConnection) -> Result<Vec<i32>> {
    let mut chain = vec![board.id];
    let mut seen = HashSet::from([board.id]);
    let mut next = board.parent_id;

    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            tracing::error!(board_id = board.id, parent_id, "Ancestor walk revisited a board");
            return Err(BoardError::CorruptHierarchy { id: parent_id });
        }
        chain.push(parent_id);
        next = Board::find_parent_id(parent_id, db_connection)?
            .ok_or(BoardError::CorruptHierarchy { id: parent_id })?;
    }

    Ok(chain)
}

/// Number of ancestor hops from `board` to its root. No board counts as
/// depth 0.
pub fn depth(board: Option<&Board>, db_connection: &mut SqliteConnection) -> Result<usize> {
    match board {
        Some(board) => Ok(ancestor_chain(board, db_connection)?.len() - 1),
        None => Ok(0),
    }
}

/// Descendant ids of `board_id` grouped by distance, nearest level first.
/// A leaf has no levels.
pub fn descendant_levels(
    board_id: i32,
    db_connection: &mut SqliteConnection,
) -> Result<Vec<Vec<i32>>> {
    let mut levels: Vec<Vec<i32>> = Vec::new();
    let mut seen = HashSet::from([board_id]);
    let mut frontier = vec![board_id];

    loop {
        let mut next = Vec::new();
        for chunk in frontier.chunks(MAX_IDS_PER_QUERY) {
            next.extend(Board::find_child_ids(chunk, db_connection)?);
        }
        if next.is_empty() {
            break;
        }
        if let Some(&revisited) = next.iter().find(|id| !seen.insert(**id)) {
            tracing::error!(board_id, revisited, "Subtree walk revisited a board");
            return Err(BoardError::CorruptHierarchy { id: revisited });
        }
        levels.push(next.clone());
        frontier = next;
    }

    Ok(levels)
}

/// Levels below `board_id`: 0 for a leaf.
pub fn subtree_height(board_id: i32, db_connection: &mut SqliteConnection) -> Result<usize> {
    Ok(descendant_levels(board_id, db_connection)?.len())
}

/// Fails with `DepthExceeded` unless a subtree `height` levels tall fits
/// directly under a parent at `parent_depth`.
pub fn ensure_fits_under(parent_depth: usize, height: usize) -> Result<()> {
    if parent_depth + 1 + height > MAX_DEPTH {
        return Err(BoardError::DepthExceeded);
    }
    Ok(())
}

/// Loads the subtree rooted at `board`, children in id order.
pub fn build_hierarchy(board: Board, db_connection: &mut SqliteConnection) -> Result<BoardTree> {
    let mut seen = HashSet::new();
    build_node(board, &mut seen, db_connection)
}

fn build_node(
    board: Board,
    seen: &mut HashSet<i32>,
    db_connection: &mut SqliteConnection,
) -> Result<BoardTree> {
    if !seen.insert(board.id) {
        tracing::error!(board_id = board.id, "Hierarchy build revisited a board");
        return Err(BoardError::CorruptHierarchy { id: board.id });
    }

    let mut children = Vec::new();
    for child in Board::find_children(board.id, db_connection)? {
        children.push(build_node(child, seen, db_connection)?);
    }

    Ok(BoardTree { board, children })
}
