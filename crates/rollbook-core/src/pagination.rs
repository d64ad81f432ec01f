//! Pagination parameters and metadata for list endpoints.
//!
//! Offset-based (`limit` + `offset`) and page-based (`limit` + `page`)
//! pagination are both accepted. When `page` is present it wins.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Metadata attached to every paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Total number of items across all pages
    pub total: i64,
    /// The limit that was applied
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Whether there are more items after this page
    pub has_more: bool,
}

impl PaginationMeta {
    pub fn new(total: i64, params: &PaginationParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();
        Self {
            total,
            limit,
            offset: Some(offset),
            page: params.page(),
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// Query parameters for pagination.
///
/// `limit` is clamped to [1, 100] (default 10), `offset` to >= 0 and `page`
/// to >= 1.
#[derive(Debug, Clone, Hash, Deserialize, ToSchema)]
pub struct PaginationParams {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub offset: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: Some(10),
            offset: Some(0),
            page: None,
        }
    }
}

impl PaginationParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        if let Some(page) = self.page {
            let page = page.max(1);
            (page - 1).saturating_mul(self.limit())
        } else {
            self.offset.unwrap_or(0).max(0)
        }
    }

    #[must_use]
    pub fn page(&self) -> Option<i64> {
        self.page.map(|p| p.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params_default() {
        let params = PaginationParams::default();
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.page(), None);
    }

    #[test]
    fn test_pagination_params_limit_clamped() {
        let params = PaginationParams {
            limit: Some(150),
            offset: None,
            page: None,
        };
        assert_eq!(params.limit(), 100);

        let params = PaginationParams {
            limit: Some(-10),
            offset: None,
            page: None,
        };
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_pagination_params_offset_negative() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(-5),
            page: None,
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_takes_precedence_over_offset() {
        let params = PaginationParams {
            limit: Some(20),
            offset: Some(5),
            page: Some(3),
        };
        assert_eq!(params.offset(), 40);
        assert_eq!(params.page(), Some(3));
    }

    #[test]
    fn test_meta_has_more() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(20),
            page: None,
        };
        let meta = PaginationMeta::new(31, &params);
        assert!(meta.has_more);
        assert_eq!(meta.offset, Some(20));

        let meta = PaginationMeta::new(30, &params);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_extreme_page_saturates() {
        let params = PaginationParams {
            limit: Some(100),
            offset: None,
            page: Some(i64::MAX),
        };
        assert_eq!(params.offset(), i64::MAX);

        let meta = PaginationMeta::new(5, &params);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_extreme_offset_has_no_more() {
        let params = PaginationParams {
            limit: Some(10),
            offset: Some(i64::MAX),
            page: None,
        };
        let meta = PaginationMeta::new(i64::MAX, &params);
        assert_eq!(meta.offset, Some(i64::MAX));
        assert!(!meta.has_more);
    }

    #[test]
    fn test_deserialize_from_strings() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"limit":"25","offset":"","page":"2"}"#).unwrap();
        assert_eq!(params.limit, Some(25));
        assert_eq!(params.offset, None);
        assert_eq!(params.offset(), 25);
    }
}
