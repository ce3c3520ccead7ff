//! Shared types, errors, and configuration for Rentflow.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision and minor-unit conversion
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - SMTP email delivery

pub mod config;
pub mod email;
pub mod error;
pub mod types;

pub use config::{AppConfig, EmailConfig};
pub use email::{EmailError, EmailService};
pub use error::{AppError, AppResult};
