//! Response DTOs.

use serde::{Deserialize, Serialize};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// A bare count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Result of a single mark-read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarkedResponse {
    /// Whether anything changed.
    pub updated: bool,
}

/// Result of a bulk mark-read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarkedAllResponse {
    pub marked: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Backend status: `connected` or `unavailable`.
    pub database: String,
    /// Live WebSocket connections.
    pub ws_connections: usize,
    /// Users currently online.
    pub online_users: usize,
}
