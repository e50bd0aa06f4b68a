//! Page/limit pagination for list queries.
//!
//! Pages are 1-indexed. A request is validated before any storage call and
//! turned into a `take`/`skip` pair; the result carries `{ page, limit,
//! total, pages }`.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, Result, StriveError};

/// Default page size if not specified.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Minimum page number (1-indexed).
pub const MIN_PAGE_NUMBER: u64 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// Page Request
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl PageRequest {
    /// A validated request.
    pub fn new(page: u64, limit: u64) -> Result<Self> {
        let request = Self { page, limit };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page < MIN_PAGE_NUMBER {
            return Err(StriveError::new(
                ErrorCode::InvalidInput,
                format!("Page must be at least {}", MIN_PAGE_NUMBER),
            ));
        }
        if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
            return Err(StriveError::new(
                ErrorCode::InvalidInput,
                format!("Limit must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        Ok(())
    }

    /// Rows to skip.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn page_info(&self, total: u64) -> PageInfo {
        PageInfo::new(self.page, self.limit, total)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

pub(crate) fn default_page() -> u64 {
    MIN_PAGE_NUMBER
}

pub(crate) fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

// ═══════════════════════════════════════════════════════════════════════════════
// Page Info
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    /// Zero when there are no rows.
    pub pages: u64,
}

impl PageInfo {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);

        let parsed: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn test_rejects_bad_requests() {
        assert!(PageRequest::new(0, 20).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        let err = PageRequest::new(1, 101).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.user_message(), "Limit must be between 1 and 100");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(PageInfo::new(1, 20, 0).pages, 0);
        assert_eq!(PageInfo::new(1, 20, 2).pages, 1);
        assert_eq!(PageInfo::new(1, 20, 41).pages, 3);

        let json = serde_json::to_value(PageInfo::new(1, 20, 2)).unwrap();
        assert_eq!(json, serde_json::json!({ "page": 1, "limit": 20, "total": 2, "pages": 1 }));
    }
}
