//! Administrative interface over the tracked set.

pub mod routes;

pub use routes::{create_router, ApiError, AppState};
