use thiserror::Error;

use crate::services::tree::MAX_LEVELS;

/// Everything a board operation can fail with.
///
/// The first group describes bad input (a missing board or parent, or a
/// tree-shape rule the request would break) and is reported back to the
/// caller. The second group is internal.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Board not found")]
    BoardNotFound { id: i32 },

    #[error("Parent not found")]
    ParentNotFound { id: i32 },

    #[error("Cannot exceed {} levels of depth", MAX_LEVELS)]
    DepthExceeded,

    #[error("Cannot move a board under itself or one of its descendants")]
    CycleDetected { id: i32, new_parent_id: i32 },

    #[error("Board name must not be empty")]
    InvalidName,

    /// A walk over parent links ran past the traversal cap, which only
    /// happens when the stored links contain a cycle.
    #[error("Board hierarchy is corrupt around board {id}")]
    CorruptHierarchy { id: i32 },

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BoardError {
    /// True for the not-found and validation family.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BoardError::BoardNotFound { .. }
                | BoardError::ParentNotFound { .. }
                | BoardError::DepthExceeded
                | BoardError::CycleDetected { .. }
                | BoardError::InvalidName
        )
    }
}

pub type Result<T, E = BoardError> = std::result::Result<T, E>;
