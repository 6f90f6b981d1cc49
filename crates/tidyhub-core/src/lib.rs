//! # tidyhub-core
//!
//! Core crate for TidyHub chat. Contains configuration schemas, typed
//! identifiers, pagination types, the clock abstraction, the cache provider
//! trait, and the unified error system.
//!
//! This crate has **no** internal dependencies on other TidyHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
