//! Middleware for the admin router.

pub mod logging;

pub use logging::request_logging_simple;
