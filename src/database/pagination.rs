use serde::{Deserialize, Serialize};

use crate::config::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Pages are 1-based; `limit` is clamped to the configured maximum.
    pub fn new(page: Option<i64>, limit: Option<i64>, settings: &Pagination) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(settings.page_size)
                .clamp(1, settings.max_page_size),
        }
    }

    /// `None` when the page lies beyond any offset an `i64` can hold.
    pub fn checked_offset(&self) -> Option<i64> {
        (self.page - 1).checked_mul(self.limit)
    }

    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub page: i64,
    pub page_count: i64,
    pub next_page: Option<i64>,
    pub prev_page: Option<i64>,
    pub message: Option<String>,
}

impl<T> PageContext<T> {
    /// `total_rows` counts every matching row, not just this page. A page past
    /// the end keeps the total and points back to the last page.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        let page_count = total_rows / request.limit + i64::from(total_rows % request.limit != 0);
        let prev_page = (request.page > 1 && page_count > 0)
            .then(|| (request.page - 1).min(page_count));

        if rows.is_empty() {
            return Self {
                rows,
                total_rows,
                page: request.page,
                page_count,
                next_page: None,
                prev_page,
                message: Some(String::from("No results")),
            };
        }
        let offset = request.offset();

        Self {
            next_page: (request.page < page_count).then_some(request.page + 1),
            prev_page,
            message: Some(format!(
                "{} - {} / {}",
                offset.saturating_add(1),
                offset.saturating_add(request.limit).min(total_rows),
                total_rows
            )),
            rows,
            total_rows,
            page: request.page,
            page_count,
        }
    }
}
