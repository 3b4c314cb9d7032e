pub mod config;
pub mod console;
pub mod error;
pub mod model;
pub mod notify;
pub mod parse;
pub mod reminder_log;
pub mod scheduler;
mod state;
pub mod storage;
pub mod store;
pub mod task_api;

pub use error::AppError;
pub use task_api::{TaskStats, Tracker};
