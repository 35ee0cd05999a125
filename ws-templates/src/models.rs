use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Labels = BTreeMap<String, String>;

/// Identity of the compiled definition registered with the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplateRef {
    pub id: String,
    pub uid: String,
}

/// A workspace template as seen at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceTemplate {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub description: String,
    /// Labels of this version.
    pub labels: Labels,
    pub manifest: String,
    pub version: i64,
    pub version_id: i64,
    pub is_latest: bool,
    pub is_archived: bool,
    pub workflow_template: WorkflowTemplateRef,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub manifest: String,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    /// Version the update is based on; `0` means the latest one.
    #[serde(default)]
    pub version: i64,
    pub manifest: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Labels,
}

/// One-based page selection for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PaginationRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 15;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Clamps out-of-range values: page 0 becomes 1, a zero page size
    /// becomes the default, oversized pages are capped.
    pub fn new(page: u32, page_size: u32) -> Self {
        let page_size = match page_size {
            0 => Self::DEFAULT_PAGE_SIZE,
            size => size.min(Self::MAX_PAGE_SIZE),
        };
        Self {
            page: page.max(1),
            page_size,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

// Serialize DateTime as RFC 3339 / ISO 8601 string
fn serialize_datetime<S>(dt: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let page = PaginationRequest::new(0, 0);
        assert_eq!(page, PaginationRequest::default());
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 15);

        let page = PaginationRequest::new(3, 1000);
        assert_eq!(page.page_size, 100);
        assert_eq!(page.offset(), 200);
    }
}
