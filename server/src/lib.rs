pub mod auth;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod router;
pub mod state;
pub mod types;
pub mod utils;
pub mod workspace;

pub use error::AppError;
pub use state::{AppState, build_state};

#[cfg(test)]
pub mod test_support;
