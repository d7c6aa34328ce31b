//! Common types used across the backend

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for missing values in listings and exports
pub const NOT_AVAILABLE: &str = "N/A";

/// Page sizes of the different listings
pub const STOCK_PAGE_SIZE: u32 = 10;
pub const HISTORY_PAGE_SIZE: u32 = 10;
pub const SALES_PAGE_SIZE: u32 = 25;
pub const POS_SALES_PAGE_SIZE: u32 = 15;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Build from an optional requested page, treating anything below 1 as page 1
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    /// Clamp the page to the last one that has data, like a paginator does
    /// when handed an out-of-range page number
    pub fn clamp_to(self, total_items: u64) -> Self {
        let last = total_pages(total_items, self.per_page).max(1);
        Self {
            page: self.page.min(last),
            ..self
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total_items: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(pagination, total_items),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total_items: u64) -> Self {
        Self {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items,
            total_pages: total_pages(total_items, pagination.per_page),
        }
    }
}

fn total_pages(total_items: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    u32::try_from(total_items.div_ceil(per_page)).unwrap_or(u32::MAX)
}

/// Inclusive date range filter, either end optional
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// A range covering a single day
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: Some(date),
            end: Some(date),
        }
    }

    /// Half-open UTC bounds `[from, until)` so that the end date is included whole
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let from = self.start.map(start_of_day);
        let until = self
            .end
            .and_then(|d| d.checked_add_signed(Duration::days(1)))
            .map(start_of_day);
        (from, until)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Render an optional text value, falling back to `N/A`
pub fn display_or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset() {
        let p = Pagination::new(Some(3), 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn test_pagination_page_zero_is_first_page() {
        assert_eq!(Pagination::new(Some(0), 25).page, 1);
        assert_eq!(Pagination::new(None, 25).page, 1);
    }

    #[test]
    fn test_pagination_clamps_past_last_page() {
        let p = Pagination::new(Some(9), 10).clamp_to(23);
        assert_eq!(p.page, 3);
        // Empty listings still report page 1
        let p = Pagination::new(Some(4), 10).clamp_to(0);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(Pagination::new(Some(1), 15), 31);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PaginationMeta::new(Pagination::new(None, 10), 0).total_pages, 0);
    }

    #[test]
    fn test_date_range_includes_end_day() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let (lower, upper) = DateRange::new(Some(from), Some(to)).bounds();
        assert_eq!(lower.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(upper.unwrap().to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_date_range_open_ends() {
        assert_eq!(DateRange::default().bounds(), (None, None));
    }

    #[test]
    fn test_display_or_na() {
        assert_eq!(display_or_na(Some("Acme")), "Acme");
        assert_eq!(display_or_na(Some("  ")), "N/A");
        assert_eq!(display_or_na(None), "N/A");
    }
}
