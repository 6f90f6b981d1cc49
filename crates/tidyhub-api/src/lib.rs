//! # tidyhub-api
//!
//! HTTP API layer for TidyHub chat built on Axum.
//!
//! Provides the REST endpoints, the WebSocket upgrade, bearer token
//! verification, extractors, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use jwt::{Claims, JwtVerifier};
pub use router::build_router;
pub use state::AppState;
