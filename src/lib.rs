pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod server;
pub mod services;
pub mod settings;

pub use error::{ApiError, ConsoleError};
pub use server::{AppState, botstudio_router};
