//! Keyset pagination descriptor and the lookahead page split
//!
//! A page of `limit` parents is fetched as `limit + 1` rows. If the extra row
//! shows up, another page exists; it is trimmed before the page is returned.
//! That answers "is there more?" without a separate COUNT query.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// Which way to walk from the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// No pagination: full scan in default order
    #[default]
    None,
    /// Ids greater than the cursor, ascending
    Forward,
    /// Ids less than the cursor, descending
    Backward,
}

impl Direction {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: Option<&str>) -> Self {
        match s {
            Some("forward") | Some("next") => Direction::Forward,
            Some("backward") | Some("prev") => Direction::Backward,
            _ => Direction::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    cursor: Option<String>,
    limit: i64,
    direction: Direction,
}

impl Pagination {
    /// No pagination at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn forward(limit: i64, cursor: Option<String>) -> Self {
        Self::new(Direction::Forward, limit, cursor)
    }

    pub fn backward(limit: i64, cursor: Option<String>) -> Self {
        Self::new(Direction::Backward, limit, cursor)
    }

    /// Page sizes above `MAX_PAGE_SIZE` are clamped
    pub fn new(direction: Direction, limit: i64, cursor: Option<String>) -> Self {
        Self {
            cursor,
            limit: limit.min(MAX_PAGE_SIZE),
            direction,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// False when no direction was given or `limit <= 0`; such requests fall
    /// back to an unfiltered scan.
    pub fn is_paginated(&self) -> bool {
        self.direction != Direction::None && self.limit > 0
    }

    /// Rows to ask the database for: one more than the page size
    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }
}

/// A page of results plus whether another page follows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn last_id<'a>(&'a self, id: impl Fn(&'a T) -> &'a str) -> Option<&'a str> {
        self.items.last().map(id)
    }
}

/// Trim a lookahead fetch down to `limit` items.
///
/// With `limit <= 0` nothing is trimmed and `has_more` is false.
pub fn split_page<T>(mut items: Vec<T>, limit: i64) -> Page<T> {
    if limit <= 0 {
        return Page {
            items,
            has_more: false,
        };
    }

    let limit = limit as usize;
    let has_more = items.len() > limit;
    items.truncate(limit);
    Page { items, has_more }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::from_str(Some("forward")), Direction::Forward);
        assert_eq!(Direction::from_str(Some("prev")), Direction::Backward);
        assert_eq!(Direction::from_str(Some("sideways")), Direction::None);
        assert_eq!(Direction::from_str(None), Direction::None);
    }

    #[test]
    fn test_non_positive_limit_disables_pagination() {
        assert!(!Pagination::none().is_paginated());
        assert!(!Pagination::forward(0, None).is_paginated());
        assert!(!Pagination::backward(-3, Some("9".into())).is_paginated());
        assert!(Pagination::forward(1, None).is_paginated());
    }

    #[test]
    fn test_limit_is_clamped() {
        let p = Pagination::forward(MAX_PAGE_SIZE * 10, None);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
        assert_eq!(p.fetch_limit(), MAX_PAGE_SIZE + 1);
    }

    #[test]
    fn test_split_page_with_lookahead_row() {
        let page = split_page(vec!["1", "2", "3"], 2);
        assert_eq!(page.items, vec!["1", "2"]);
        assert!(page.has_more);
    }

    #[test]
    fn test_split_page_exact_and_short() {
        let exact = split_page(vec!["1", "2"], 2);
        assert_eq!(exact.items, vec!["1", "2"]);
        assert!(!exact.has_more);

        let short = split_page(vec!["1"], 5);
        assert_eq!(short.items, vec!["1"]);
        assert!(!short.has_more);

        let empty: Page<&str> = split_page(Vec::new(), 1);
        assert!(empty.items.is_empty());
        assert!(!empty.has_more);
    }

    #[test]
    fn test_split_page_without_limit_keeps_everything() {
        let page = split_page(vec![1, 2, 3, 4], 0);
        assert_eq!(page.items.len(), 4);
        assert!(!page.has_more);
    }

    #[test]
    fn test_last_id_is_next_cursor() {
        let page = split_page(vec!["a".to_string(), "b".to_string(), "c".to_string()], 2);
        assert_eq!(page.last_id(|s| s.as_str()), Some("b"));
    }
}
