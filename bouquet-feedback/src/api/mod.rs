//! HTTP API handlers for bouquet-feedback
//!
//! The browser form posts drafts here, reads the history to decide whether
//! to show the export button, and downloads the CSV export.

pub mod export;
pub mod feedback;
pub mod health;

pub use export::download_export;
pub use feedback::{get_history, submit_feedback, ApiError};
pub use health::health_routes;
