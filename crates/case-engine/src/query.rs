//! Listing: filter, search, sort, paginate.

use crate::case::Case;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort direction; newest first by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Admin listing query, deserialized straight from the query string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseQuery {
    pub page: u32,
    pub limit: u32,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// Inclusive through the end of the named day.
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort_by: "createdAt".to_string(),
            sort_order: SortOrder::Desc,
            status: None,
            start_date: None,
            end_date: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// One page of cases plus pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CasePage {
    pub cases: Vec<Case>,
    pub pagination: PageMeta,
}

/// Apply the query to a snapshot of all cases.
pub fn select(mut cases: Vec<Case>, query: &CaseQuery) -> CasePage {
    if let Some(status) = &query.status {
        cases.retain(|c| c.status == *status);
    }
    if let Some(start) = query.start_date {
        cases.retain(|c| c.created_at.date_naive() >= start);
    }
    if let Some(end) = query.end_date {
        cases.retain(|c| c.created_at.date_naive() <= end);
    }
    if let Some(search) = &query.search {
        let term = search.to_lowercase();
        cases.retain(|c| {
            c.id.as_str().to_lowercase().contains(&term)
                || c.name.to_lowercase().contains(&term)
                || c.email.as_str().contains(&term)
                || c.service.to_lowercase().contains(&term)
        });
    }

    cases.sort_by(|a, b| {
        let ord = compare(a, b, &query.sort_by);
        match query.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let page = query.page.max(1);
    let limit = query.limit.max(1);
    let total = cases.len();
    let total_pages = (total as u32).div_ceil(limit);
    let start = (page - 1).saturating_mul(limit) as usize;
    let end = (start + limit as usize).min(total);
    let slice = if start < total {
        cases[start..end].to_vec()
    } else {
        Vec::new()
    };

    CasePage {
        cases: slice,
        pagination: PageMeta {
            page,
            limit,
            total,
            total_pages,
            has_next_page: end < total,
            has_prev_page: page > 1,
        },
    }
}

fn compare(a: &Case, b: &Case, key: &str) -> Ordering {
    match key {
        "id" => a.id.as_str().cmp(b.id.as_str()),
        "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        "email" => a.email.as_str().cmp(b.email.as_str()),
        "status" => a.status.cmp(&b.status),
        "service" => a.service.to_lowercase().cmp(&b.service.to_lowercase()),
        "updatedAt" => a.updated_at.cmp(&b.updated_at),
        // Unknown keys fall back to creation time.
        _ => a.created_at.cmp(&b.created_at),
    }
}
