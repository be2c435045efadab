//! Offset/limit pagination over an id-ordered sequence.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Sort direction by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `"desc"` selects descending order; anything else is ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }
}

/// Normalized pagination parameters.
///
/// Construct with [`PageQuery::from_raw`], which never fails: bad input is
/// clamped or replaced with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub offset: usize,
    pub limit: usize,
    pub sort: SortOrder,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort: SortOrder::Asc,
        }
    }
}

impl PageQuery {
    /// Builds a query from raw query-string values.
    ///
    /// - `offset`: integer, clamped to `>= 0`; missing or unparsable → `0`.
    /// - `limit`: integer, clamped to `1..=100`; missing or unparsable → `10`.
    /// - `sort`: `desc` or ascending.
    pub fn from_raw(offset: Option<&str>, limit: Option<&str>, sort: Option<&str>) -> Self {
        let offset = offset
            .and_then(parse_int)
            .map_or(0, |n| n.max(0) as usize);
        let limit = match limit.and_then(parse_int) {
            Some(n) if n != 0 => n.clamp(1, MAX_LIMIT as i64) as usize,
            _ => DEFAULT_LIMIT,
        };
        Self {
            offset,
            limit,
            sort: SortOrder::parse(sort),
        }
    }
}

/// Reads a leading integer the way lenient query parsers do: "12abc" → 12.
pub fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let digits_end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(raw.len(), |(i, _)| i);
    raw[..digits_end].parse().ok()
}

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
    pub has_more: bool,
}

/// One page of items plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

/// Anything with a numeric id to sort by.
pub trait Identified {
    fn id(&self) -> u64;
}

/// Sorts a copy of `source` by id in the requested direction and slices out
/// the requested page.
///
/// The page length is `min(limit, total - offset)`, or zero when
/// `offset >= total`; `has_more` is exactly `offset + limit < total`.
pub fn paginate<T>(source: &[T], query: PageQuery) -> Page<T>
where
    T: Identified + Clone,
{
    let mut sorted = source.to_vec();
    match query.sort {
        SortOrder::Asc => sorted.sort_by_key(Identified::id),
        SortOrder::Desc => sorted.sort_by_key(|item| std::cmp::Reverse(item.id())),
    }

    let total = sorted.len();
    let start = query.offset.min(total);
    let end = query.offset.saturating_add(query.limit).min(total);
    let items = sorted.drain(start..end).collect();

    Page {
        items,
        info: PageInfo {
            offset: query.offset,
            limit: query.limit,
            total,
            has_more: query.offset.saturating_add(query.limit) < total,
        },
    }
}
