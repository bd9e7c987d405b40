//! HTTP client for the boards API plus the pure helpers the terminal
//! client renders with.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    api::{BoardView, CreateBoardRequest, ErrorBody, MoveBoardRequest, Notification},
    services::tree::MAX_DEPTH,
};

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server rejected the request and said why.
    #[error("{0}")]
    Api(String),

    #[error("server answered {status}")]
    Status { status: StatusCode },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct BoardsClient {
    http: reqwest::Client,
    base_url: String,
}

impl BoardsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        BoardsClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub async fn list(&self) -> Result<Vec<BoardView>, ClientError> {
        let response = self.http.get(self.url("boards")).send().await?;
        decode(response).await
    }

    pub async fn create(&self, name: &str, parent_id: Option<i32>) -> Result<BoardView, ClientError> {
        let request = CreateBoardRequest {
            name: name.to_string(),
            parent_id,
        };
        let response = self
            .http
            .post(self.url("boards"))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn delete(&self, board_id: i32) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("boards/{}", board_id)))
            .send()
            .await?;
        check(response).await.map(|_| ())
    }

    pub async fn move_board(
        &self,
        board_id: i32,
        new_parent_id: Option<i32>,
    ) -> Result<BoardView, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("boards/{}/move", board_id)))
            .json(&MoveBoardRequest { new_parent_id })
            .send()
            .await?;
        decode(response).await
    }

    /// Opens the notification stream. Feed its chunks to [`SseDecoder`].
    pub async fn notifications(&self) -> Result<Response, ClientError> {
        let response = self.http.get(self.url("notifications")).send().await?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(ClientError::Api(body.error)),
        Err(_) => Err(ClientError::Status { status }),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json().await?)
}

/// Each board with its depth, in display order.
pub fn flatten(forest: &[BoardView]) -> Vec<(usize, &BoardView)> {
    fn walk<'a>(boards: &'a [BoardView], depth: usize, out: &mut Vec<(usize, &'a BoardView)>) {
        for board in boards {
            out.push((depth, board));
            walk(board.children(), depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(forest, 0, &mut out);
    out
}

/// Levels below `board`: 0 for a leaf.
pub fn height(board: &BoardView) -> usize {
    board
        .children()
        .iter()
        .map(|child| height(child) + 1)
        .max()
        .unwrap_or(0)
}

/// One line per board, children indented under their parent.
pub fn render_forest(forest: &[BoardView]) -> String {
    if forest.is_empty() {
        return "No boards yet.\n".to_string();
    }

    let mut out = String::new();
    for (depth, board) in flatten(forest) {
        if depth > 0 {
            out.push_str(&"—".repeat(depth));
            out.push(' ');
        }
        out.push_str(&format!("{} [{}]", board.name, board.id));
        if depth >= MAX_DEPTH {
            out.push_str(" (max depth)");
        }
        out.push('\n');
    }
    out
}

/// Boards `board_id` can be moved under without creating a cycle or
/// pushing any of its descendants past the depth ceiling.
pub fn move_targets(forest: &[BoardView], board_id: i32) -> Vec<&BoardView> {
    let flat = flatten(forest);
    let Some((_, board)) = flat.iter().find(|(_, board)| board.id == board_id) else {
        return Vec::new();
    };

    let subtree: Vec<i32> = flatten(std::slice::from_ref(*board))
        .into_iter()
        .map(|(_, board)| board.id)
        .collect();
    let moved_height = height(board);

    flat.iter()
        .filter(|(depth, target)| {
            !subtree.contains(&target.id) && depth + 1 + moved_height <= MAX_DEPTH
        })
        .map(|(_, target)| *target)
        .collect()
}

/// Incremental decoder for the `text/event-stream` notification feed.
///
/// Bytes are buffered until a blank line closes a frame, so a multi-byte
/// character or a `\r\n` split across chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Appends raw bytes and returns every notification completed by them.
    /// Keep-alive comments and events with other payloads are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Notification> {
        self.buffer.extend_from_slice(chunk);

        let mut notifications = Vec::new();
        while let Some((end, delimiter)) = frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + delimiter).collect();
            let frame = String::from_utf8_lossy(&frame[..end]);
            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if data.is_empty() {
                continue;
            }
            if let Ok(notification) = serde_json::from_str::<Notification>(&data.join("\n")) {
                notifications.push(notification);
            }
        }
        notifications
    }
}

/// Offset and length of the first blank-line delimiter in `buffer`.
fn frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    [&b"\r\n\r\n"[..], &b"\n\n"[..]]
        .iter()
        .filter_map(|delimiter| {
            buffer
                .windows(delimiter.len())
                .position(|window| window == *delimiter)
                .map(|at| (at, delimiter.len()))
        })
        .min_by_key(|(at, _)| *at)
}
