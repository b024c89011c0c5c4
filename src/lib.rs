// Page CMS - schema-driven page content backend

// Page content model - resolution, schema merging, derived fields
pub mod content;

// Core primitives
pub mod core;

// Page lifecycle hooks
pub mod ent_framework;

// Persistence and request plumbing
pub mod infrastructure;

// Page entity and satellite records
pub mod models;

// Services used by the HTTP layer
pub mod services;

// Outbound mail
pub mod mail;

// HTTP surface
pub mod app_state;
pub mod config;
pub mod page_interface;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
