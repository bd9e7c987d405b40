use chrono::Utc;
use diesel::{Connection, SqliteConnection};

use super::tree::{
    ancestor_chain, build_hierarchy, depth, descendant_levels, ensure_fits_under, subtree_height,
};
use crate::{
    api::BoardView,
    config::MoveDepthCheck,
    db::{
        connection::DbPool,
        models::{Board, BoardParentChangeSet, NewBoard},
        repos::board::{CreateBoard, DeleteBoard, FindBoard, MoveBoard},
    },
    error::{BoardError, Result},
};

/// Create, delete, move and list boards while keeping the forest within
/// the depth ceiling.
///
/// Diesel is synchronous, so every operation checks a connection out of the
/// pool on tokio's blocking pool. Mutations run inside `BEGIN IMMEDIATE`,
/// which takes SQLite's write lock before the depth check is read; two
/// requests racing on the same parent are serialized.
#[derive(Clone)]
pub struct BoardService {
    pool: DbPool,
    move_depth_check: MoveDepthCheck,
}

impl BoardService {
    pub fn new(pool: DbPool, move_depth_check: MoveDepthCheck) -> Self {
        BoardService {
            pool,
            move_depth_check,
        }
    }

    #[cfg(test)]
    fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// The name is stored exactly as given; only a blank one is refused.
    pub async fn create(&self, name: &str, parent_id: Option<i32>) -> Result<BoardView> {
        if name.trim().is_empty() {
            return Err(BoardError::InvalidName);
        }
        let name = name.to_string();

        let board = self
            .run(move |db_connection| {
                db_connection.immediate_transaction(|conn| create_board(&name, parent_id, conn))
            })
            .await?;

        tracing::info!(board_id = board.id, parent_id = ?board.parent_id, "Board created");
        Ok(board)
    }

    /// Returns how many boards were removed, the board itself included.
    pub async fn delete(&self, board_id: i32) -> Result<usize> {
        let removed = self
            .run(move |db_connection| {
                db_connection.immediate_transaction(|conn| delete_board(board_id, conn))
            })
            .await?;

        tracing::info!(board_id, removed, "Board deleted");
        Ok(removed)
    }

    pub async fn move_board(&self, board_id: i32, new_parent_id: Option<i32>) -> Result<BoardView> {
        let check = self.move_depth_check;
        let board = self
            .run(move |db_connection| {
                db_connection
                    .immediate_transaction(|conn| move_board(board_id, new_parent_id, check, conn))
            })
            .await?;

        tracing::info!(board_id, parent_id = ?board.parent_id, "Board moved");
        Ok(board)
    }

    /// Every root with its subtree nested under `children`.
    pub async fn list(&self) -> Result<Vec<BoardView>> {
        self.run(|db_connection| db_connection.transaction(list_boards))
            .await
    }

    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut db_connection = pool.get()?;
            operation(&mut *db_connection)
        })
        .await?
    }
}

fn find_parent(parent_id: i32, db_connection: &mut SqliteConnection) -> Result<Board> {
    Board::find(parent_id, db_connection)?.ok_or(BoardError::ParentNotFound { id: parent_id })
}

fn create_board(
    name: &str,
    parent_id: Option<i32>,
    db_connection: &mut SqliteConnection,
) -> Result<BoardView> {
    let parent = match parent_id {
        Some(parent_id) => Some(find_parent(parent_id, db_connection)?),
        None => None,
    };
    if parent.is_some() {
        ensure_fits_under(depth(parent.as_ref(), db_connection)?, 0)?;
    }

    let now = Utc::now().naive_utc();
    let board = Board::create(
        NewBoard {
            name,
            parent_id: parent.as_ref().map(|parent| parent.id),
            created_at: now,
            updated_at: now,
        },
        db_connection,
    )?;

    Ok(BoardView::new(board, parent.as_ref()))
}

fn delete_board(board_id: i32, db_connection: &mut SqliteConnection) -> Result<usize> {
    if Board::find(board_id, db_connection)?.is_none() {
        return Err(BoardError::BoardNotFound { id: board_id });
    }
    let descendants: usize = descendant_levels(board_id, db_connection)?
        .iter()
        .map(Vec::len)
        .sum();

    Board::delete(board_id, db_connection)?;
    Ok(descendants + 1)
}

fn move_board(
    board_id: i32,
    new_parent_id: Option<i32>,
    check: MoveDepthCheck,
    db_connection: &mut SqliteConnection,
) -> Result<BoardView> {
    if Board::find(board_id, db_connection)?.is_none() {
        return Err(BoardError::BoardNotFound { id: board_id });
    }

    let new_parent = match new_parent_id {
        Some(parent_id) => {
            let parent = find_parent(parent_id, db_connection)?;
            let chain = ancestor_chain(&parent, db_connection)?;
            if chain.contains(&board_id) {
                return Err(BoardError::CycleDetected {
                    id: board_id,
                    new_parent_id: parent_id,
                });
            }

            let height = match check {
                MoveDepthCheck::Parent => 0,
                MoveDepthCheck::Subtree => subtree_height(board_id, db_connection)?,
            };
            ensure_fits_under(chain.len() - 1, height)?;
            Some(parent)
        }
        None => None,
    };

    let board = Board::reparent(
        board_id,
        BoardParentChangeSet {
            parent_id: new_parent.as_ref().map(|parent| parent.id),
            updated_at: Utc::now().naive_utc(),
        },
        db_connection,
    )?;

    Ok(BoardView::new(board, new_parent.as_ref()))
}

fn list_boards(db_connection: &mut SqliteConnection) -> Result<Vec<BoardView>> {
    let mut forest = Vec::new();
    for root in Board::find_roots(db_connection)? {
        let tree = build_hierarchy(root, db_connection)?;
        forest.push(BoardView::from_tree(tree, None));
    }
    tracing::debug!(roots = forest.len(), "Board forest loaded");
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::temp_pool;
    use tempfile::TempDir;

    fn service(check: MoveDepthCheck) -> (BoardService, TempDir) {
        let (pool, dir) = temp_pool();
        (BoardService::new(pool, check), dir)
    }

    fn count(service: &BoardService) -> i64 {
        let mut conn = service.pool().get().unwrap();
        Board::count(&mut conn).unwrap()
    }

    async fn chain(service: &BoardService, levels: usize) -> Vec<BoardView> {
        let mut boards: Vec<BoardView> = Vec::new();
        for level in 0..levels {
            let parent_id = boards.last().map(|board| board.id);
            let board = service
                .create(&format!("Level {}", level), parent_id)
                .await
                .unwrap();
            boards.push(board);
        }
        boards
    }

    #[tokio::test]
    async fn list_is_empty_for_a_new_store() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn root_boards_show_up_as_roots() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let board = service.create("  Root Board ", None).await.unwrap();

        assert_eq!(board.name, "  Root Board ");
        assert_eq!(board.parent_id, None);
        assert!(board.children.is_none());

        let forest = service.list().await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, board.id);
        assert!(forest[0].children().is_empty());
    }

    #[tokio::test]
    async fn child_board_carries_its_parent() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let parent = service.create("Parent", None).await.unwrap();
        let child = service.create("Child", Some(parent.id)).await.unwrap();

        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(child.parent.as_ref().map(|p| p.id), Some(parent.id));
    }

    #[tokio::test]
    async fn ten_levels_fit_and_the_eleventh_is_rejected() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let boards = chain(&service, 10).await;
        let deepest = boards.last().unwrap();

        let result = service.create("Too Deep", Some(deepest.id)).await;
        assert!(matches!(result, Err(BoardError::DepthExceeded)));
        assert_eq!(count(&service), 10);

        // A parent at depth 8 still takes a child.
        assert!(service.create("Sibling", Some(boards[8].id)).await.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_missing_parent_and_blank_name() {
        let (service, _dir) = service(MoveDepthCheck::Parent);

        let result = service.create("Orphan", Some(404)).await;
        assert!(matches!(result, Err(BoardError::ParentNotFound { id: 404 })));

        let result = service.create("   ", None).await;
        assert!(matches!(result, Err(BoardError::InvalidName)));
        assert_eq!(count(&service), 0);
    }

    #[tokio::test]
    async fn delete_removes_the_whole_subtree() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let root = service.create("Root", None).await.unwrap();
        let child = service.create("Child", Some(root.id)).await.unwrap();
        service.create("Grandchild", Some(child.id)).await.unwrap();
        service.create("Second child", Some(root.id)).await.unwrap();
        let keep = service.create("Keep", None).await.unwrap();

        assert_eq!(service.delete(root.id).await.unwrap(), 4);
        assert_eq!(count(&service), 1);

        let forest = service.list().await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, keep.id);
    }

    #[tokio::test]
    async fn delete_missing_board_is_not_found() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let result = service.delete(12).await;
        assert!(matches!(result, Err(BoardError::BoardNotFound { id: 12 })));
    }

    #[tokio::test]
    async fn moving_a_root_under_another_root_nests_it() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let first = service.create("Root 1", None).await.unwrap();
        let second = service.create("Root 2", None).await.unwrap();

        let moved = service.move_board(first.id, Some(second.id)).await.unwrap();
        assert_eq!(moved.parent_id, Some(second.id));

        let forest = service.list().await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, second.id);
        assert_eq!(forest[0].children()[0].id, first.id);
    }

    #[tokio::test]
    async fn moving_to_none_promotes_to_root() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let root = service.create("Root", None).await.unwrap();
        let child = service.create("Child", Some(root.id)).await.unwrap();

        let moved = service.move_board(child.id, None).await.unwrap();
        assert_eq!(moved.parent_id, None);
        assert!(moved.parent.is_none());
        assert_eq!(service.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn moving_under_a_full_depth_parent_leaves_board_in_place() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let boards = chain(&service, 10).await;
        let loose = service.create("Loose", None).await.unwrap();

        let result = service.move_board(loose.id, Some(boards[9].id)).await;
        assert!(matches!(result, Err(BoardError::DepthExceeded)));

        let forest = service.list().await.unwrap();
        assert!(forest.iter().any(|root| root.id == loose.id));
    }

    #[tokio::test]
    async fn moving_into_own_subtree_is_a_cycle() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let root = service.create("Root", None).await.unwrap();
        let child = service.create("Child", Some(root.id)).await.unwrap();
        let grandchild = service.create("Grandchild", Some(child.id)).await.unwrap();

        let result = service.move_board(root.id, Some(grandchild.id)).await;
        assert!(matches!(result, Err(BoardError::CycleDetected { .. })));

        let result = service.move_board(child.id, Some(child.id)).await;
        assert!(matches!(result, Err(BoardError::CycleDetected { .. })));

        let forest = service.list().await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children()[0].children()[0].id, grandchild.id);
    }

    #[tokio::test]
    async fn moving_requires_existing_board_and_parent() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let root = service.create("Root", None).await.unwrap();

        let result = service.move_board(99, Some(root.id)).await;
        assert!(matches!(result, Err(BoardError::BoardNotFound { id: 99 })));

        let result = service.move_board(root.id, Some(99)).await;
        assert!(matches!(result, Err(BoardError::ParentNotFound { id: 99 })));
    }

    #[tokio::test]
    async fn parent_policy_ignores_subtree_height() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let deep = chain(&service, 5).await;
        let tall = chain(&service, 5).await;

        // Leaves land at depth 4 + 1 + 4 = 9.
        service.move_board(tall[0].id, Some(deep[4].id)).await.unwrap();

        // tall[3] now sits at depth 8, which passes the parent check even
        // though the moved leaves land at depth 11.
        let other_tall = chain(&service, 3).await;
        service
            .move_board(other_tall[0].id, Some(tall[3].id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn subtree_policy_rejects_moves_that_overflow() {
        let (service, _dir) = service(MoveDepthCheck::Subtree);
        let deep = chain(&service, 5).await;
        let tall = chain(&service, 5).await;

        // Leaves land at depth 4 + 1 + 4 = 9: fits exactly.
        service.move_board(tall[0].id, Some(deep[4].id)).await.unwrap();

        // tall[2] sits at depth 7; a subtree two levels tall would reach 10.
        let other_tall = chain(&service, 3).await;
        let result = service.move_board(other_tall[0].id, Some(tall[2].id)).await;
        assert!(matches!(result, Err(BoardError::DepthExceeded)));

        // A single board still fits there.
        service
            .move_board(other_tall[2].id, Some(tall[2].id))
            .await
            .unwrap();
    }

    fn deepest_level(board: &BoardView) -> usize {
        board
            .children()
            .iter()
            .map(|child| deepest_level(child) + 1)
            .max()
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn trees_grown_past_the_ceiling_by_moves_stay_usable() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let first = chain(&service, 10).await;
        let mut top = first.clone();

        // Each move hangs the current tree under a depth-8 board, adding
        // nine levels while passing the parent check.
        for _ in 0..8 {
            let next = chain(&service, 10).await;
            service.move_board(top[0].id, Some(next[8].id)).await.unwrap();
            top = next;
        }

        let forest = service.list().await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, top[0].id);
        assert_eq!(deepest_level(&forest[0]), 81);

        let deepest = first.last().unwrap();
        let result = service.create("Deeper", Some(deepest.id)).await;
        assert!(matches!(result, Err(BoardError::DepthExceeded)));

        let result = service.move_board(top[1].id, Some(deepest.id)).await;
        assert!(matches!(result, Err(BoardError::CycleDetected { .. })));

        assert_eq!(service.delete(top[0].id).await.unwrap(), 90);
        assert_eq!(count(&service), 0);
    }

    #[tokio::test]
    async fn concurrent_creates_under_one_parent_all_land() {
        let (service, _dir) = service(MoveDepthCheck::Parent);
        let root = service.create("Root", None).await.unwrap();

        let mut handles = Vec::new();
        for index in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.create(&format!("Child {}", index), Some(root.id)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let forest = service.list().await.unwrap();
        assert_eq!(forest[0].children().len(), 8);
    }
}
