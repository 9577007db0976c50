//! # Churn Common Library
//!
//! Shared code for the churn-prediction client crates:
//! - Error and result types
//! - Configuration loading and resolution
//! - Backend request/response types

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
