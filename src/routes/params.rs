use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    entity::orders::OrderStatus,
    error::{AppError, AppResult},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
}

impl Pagination {
    /// Fills in defaults and clamps `per_page` to 1..=100. A page whose offset does not fit
    /// in an `i64` is rejected.
    pub fn normalize(&self) -> AppResult<PageWindow> {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| AppError::BadRequest("Invalid page.".into()))?;
        Ok(PageWindow {
            page,
            per_page,
            offset,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrdering {
    Ascending,
    Descending,
}

impl PriceOrdering {
    /// `price` and `-price` are the only recognised orderings; anything else is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "price" => Some(PriceOrdering::Ascending),
            "-price" => Some(PriceOrdering::Descending),
            _ => None,
        }
    }
}

// Query structs repeat the paging fields instead of flattening `Pagination`:
// serde_urlencoded hands flattened fields over as strings, which breaks numeric parsing.

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MenuItemQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Category id or slug.
    pub category: Option<String>,
    pub search: Option<String>,
    /// `price` or `-price`.
    pub ordering: Option<String>,
}

impl MenuItemQuery {
    pub fn window(&self) -> AppResult<PageWindow> {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
        .normalize()
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    pub fn window(&self) -> AppResult<PageWindow> {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
        .normalize()
    }
}
