use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};

use super::{AppState, HttpError};
use crate::api::{BoardView, CreateBoardRequest, MoveBoardRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/:id", delete(delete_board))
        .route("/boards/:id/move", patch(move_board))
}

fn board_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, HttpError> {
    path.map(|Path(id)| id)
        .map_err(|_| HttpError::bad_request("Invalid board id"))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, HttpError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| HttpError::bad_request(rejection.body_text()))
}

async fn create_board(
    State(state): State<AppState>,
    payload: Result<Json<CreateBoardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BoardView>), HttpError> {
    let request = body(payload)?;
    let board = state.boards.create(&request.name, request.parent_id).await?;

    Ok((StatusCode::CREATED, Json(board)))
}

async fn delete_board(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, HttpError> {
    state.boards.delete(board_id(path)?).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn move_board(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<MoveBoardRequest>, JsonRejection>,
) -> Result<Json<BoardView>, HttpError> {
    let id = board_id(path)?;
    let request = body(payload)?;
    let board = state.boards.move_board(id, request.new_parent_id).await?;

    Ok(Json(board))
}

async fn list_boards(State(state): State<AppState>) -> Result<Json<Vec<BoardView>>, HttpError> {
    Ok(Json(state.boards.list().await?))
}
