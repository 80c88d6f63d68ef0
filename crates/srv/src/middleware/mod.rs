//! Middlewares shipped with the crate.

mod error_boundary;

pub use error_boundary::{ErrorBoundary, ErrorReporter};
