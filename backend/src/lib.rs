//! Notes backend: user registration and login with bearer tokens, and
//! per-user CRUD on notes, served as a JSON API under `/api`.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notes;
pub mod store;

pub use config::Config;
pub use error::{ApiError, Result};
pub use handlers::{router, AppData, AppState};
