pub mod board;
pub mod tree;

pub use board::BoardService;
