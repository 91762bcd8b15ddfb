pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
