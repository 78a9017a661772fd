//! # IQAC Common Library
//!
//! Shared code for the IQAC portal:
//! - Database initialization, schema and settings
//! - Entity models and their validation rules
//! - Password hashing
//! - Configuration loading and root folder resolution
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{Role, Status};
