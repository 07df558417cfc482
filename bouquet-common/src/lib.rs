//! # Bouquet Common Library
//!
//! Shared code for the bouquet feedback crates:
//! - Error type
//! - Bootstrap configuration loading and root folder resolution
//! - SQLite local storage initialization
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
