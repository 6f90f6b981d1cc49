//! Pagination query parameter extractor.

use serde::{Deserialize, Serialize};

use tidyhub_core::types::pagination::PageRequest;
use tidyhub_service::NotificationService;

/// Query parameters for paginated endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-based, default: 1).
    pub page: Option<u64>,
    /// Items per page (default from configuration, max: 100).
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Converts to a `PageRequest`, filling defaults from the service.
    pub fn into_page_request(self, notifications: &NotificationService) -> PageRequest {
        notifications.page_request(self.page, self.per_page)
    }
}
