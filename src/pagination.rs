use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

/// PageParams
///
/// The `?page=` query parameter. Kept as a raw string so that garbage input
/// degrades to the first page instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageParams {
    /// 1-indexed page number.
    pub page: Option<String>,
}

/// PageMeta
///
/// Navigation metadata rendered alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PageMeta {
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// A slice of a collection plus its navigation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// The rows a resolved page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Paginator
///
/// Splits a collection of `total_count` items into fixed-size pages.
///
/// An empty collection still has one (empty) page. Requested page numbers are
/// resolved leniently:
/// - missing or non-numeric input selects page 1;
/// - an integer outside `1..=num_pages`, however large, selects the last page.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: i64,
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: i64::from(per_page.max(1)),
        }
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn num_pages(&self, total_count: i64) -> i64 {
        if total_count <= 0 {
            1
        } else {
            (total_count + self.per_page - 1) / self.per_page
        }
    }

    pub fn window(&self, requested: Option<&str>, total_count: i64) -> PageWindow {
        let num_pages = self.num_pages(total_count);
        let number = match requested.map(str::trim).filter(|raw| is_integer(raw)) {
            // Integers too large for i64 are out of range as well.
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if (1..=num_pages).contains(&n) => n,
                _ => num_pages,
            },
            None => 1,
        };
        PageWindow {
            number,
            limit: self.per_page,
            offset: (number - 1) * self.per_page,
        }
    }

    pub fn page<T>(&self, window: PageWindow, items: Vec<T>, total_count: i64) -> Page<T> {
        let num_pages = self.num_pages(total_count);
        Page {
            items,
            meta: PageMeta {
                number: window.number,
                num_pages,
                per_page: self.per_page,
                total_count,
                has_next: window.number < num_pages,
                has_previous: window.number > 1,
            },
        }
    }
}

/// An optionally signed run of ASCII digits, of any length.
fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
