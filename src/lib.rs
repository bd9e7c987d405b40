pub mod api;
pub mod client;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod notifications;
pub mod services;

pub use error::{BoardError, Result};
