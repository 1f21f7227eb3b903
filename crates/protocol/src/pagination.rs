use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    #[default]
    Forward,
    Backward,
}

/// Cursor-based page request. The cursor is the key of the last item seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub direction: PageDirection,
}

impl CursorPagination {
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn after(cursor: impl Into<String>, limit: usize) -> Self {
        Self {
            cursor: Some(cursor.into()),
            limit: Some(limit),
            direction: PageDirection::Forward,
        }
    }

    #[must_use]
    pub fn before(cursor: impl Into<String>, limit: usize) -> Self {
        Self {
            cursor: Some(cursor.into()),
            limit: Some(limit),
            direction: PageDirection::Backward,
        }
    }

    /// Effective page size: defaults to [`DEFAULT_PAGE_LIMIT`], never below 1.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1)
    }

    fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPaginationResult<T> {
    pub items: Vec<T>,
    /// `None` once the walk in the requested direction is exhausted
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> CursorPaginationResult<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

/// Page through `items` ordered by `key` ascending.
///
/// Forward pages hold keys strictly greater than the cursor, backward pages
/// keys strictly smaller (the tail when no cursor is given). Items inside a
/// page are always ascending. Because the cursor is compared rather than
/// looked up, it stays valid after the item it names is removed.
pub fn paginate_by_key<T, F>(
    mut items: Vec<T>,
    key: F,
    pagination: &CursorPagination,
) -> CursorPaginationResult<T>
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| key(a).cmp(key(b)));
    let limit = pagination.effective_limit();

    match pagination.direction {
        PageDirection::Forward => {
            let start = pagination
                .cursor()
                .map_or(0, |cursor| items.partition_point(|item| key(item) <= cursor));
            let end = start.saturating_add(limit).min(items.len());
            let has_more = end < items.len();
            let page: Vec<T> = items.drain(start..end).collect();
            let next_cursor = if has_more {
                page.last().map(|item| key(item).to_string())
            } else {
                None
            };
            CursorPaginationResult {
                items: page,
                next_cursor,
                has_more,
            }
        }
        PageDirection::Backward => {
            let end = pagination
                .cursor()
                .map_or(items.len(), |cursor| {
                    items.partition_point(|item| key(item) < cursor)
                });
            let start = end.saturating_sub(limit);
            let has_more = start > 0;
            let page: Vec<T> = items.drain(start..end).collect();
            let next_cursor = if has_more {
                page.first().map(|item| key(item).to_string())
            } else {
                None
            };
            CursorPaginationResult {
                items: page,
                next_cursor,
                has_more,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{i:03}")).collect()
    }

    #[test]
    fn forward_walk_is_exhaustive_without_duplicates() {
        let all = keys(23);
        for limit in 1..=25 {
            let mut seen = Vec::new();
            let mut request = CursorPagination::first(limit);
            loop {
                let page = paginate_by_key(all.clone(), |s| s.as_str(), &request);
                assert!(page.items.len() <= limit);
                seen.extend(page.items);
                match page.next_cursor {
                    Some(cursor) => request = CursorPagination::after(cursor, limit),
                    None => break,
                }
            }
            assert_eq!(seen, all, "limit {limit}");
        }
    }

    #[test]
    fn backward_walk_returns_tail_first() {
        let all = keys(5);
        let page = paginate_by_key(
            all.clone(),
            |s| s.as_str(),
            &CursorPagination {
                limit: Some(2),
                direction: PageDirection::Backward,
                ..Default::default()
            },
        );
        assert_eq!(page.items, vec!["k003".to_string(), "k004".to_string()]);
        assert_eq!(page.next_cursor.as_deref(), Some("k003"));

        let page = paginate_by_key(all, |s| s.as_str(), &CursorPagination::before("k003", 5));
        assert_eq!(page.items, keys(3));
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn removed_cursor_still_resumes() {
        let mut all = keys(6);
        let first = paginate_by_key(all.clone(), |s| s.as_str(), &CursorPagination::first(3));
        let cursor = first.next_cursor.expect("more pages");
        all.retain(|k| *k != cursor);
        let second = paginate_by_key(all, |s| s.as_str(), &CursorPagination::after(cursor, 3));
        assert_eq!(second.items, vec!["k003", "k004", "k005"]);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let page = paginate_by_key(keys(3), |s| s.as_str(), &CursorPagination::first(0));
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
    }

    #[test]
    fn default_limit_applies() {
        let page = paginate_by_key(keys(30), |s| s.as_str(), &CursorPagination::default());
        assert_eq!(page.items.len(), DEFAULT_PAGE_LIMIT);
    }
}
