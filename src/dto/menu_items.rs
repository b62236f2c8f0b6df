use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::MenuItem,
};

pub const TITLE_MAX_LEN: usize = 120;
/// Six significant digits with two decimals: 9999.99.
pub const MAX_PRICE: i64 = 999_999;

/// Body of `POST` and `PUT`. `featured` is not writable here; see the featured endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MenuItemRequest {
    pub title: String,
    /// Minor currency units.
    pub price: i64,
    #[serde(default)]
    pub inventory: i32,
    pub category_id: i32,
}

/// Body of `PATCH`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MenuItemPatch {
    pub title: Option<String>,
    pub price: Option<i64>,
    pub inventory: Option<i32>,
    pub category_id: Option<i32>,
}

impl From<MenuItemRequest> for MenuItemPatch {
    fn from(req: MenuItemRequest) -> Self {
        MenuItemPatch {
            title: Some(req.title),
            price: Some(req.price),
            inventory: Some(req.inventory),
            category_id: Some(req.category_id),
        }
    }
}

impl MenuItemPatch {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                errors
                    .entry("title".into())
                    .or_default()
                    .push("This field may not be blank.".into());
            } else if title.chars().count() > TITLE_MAX_LEN {
                errors.entry("title".into()).or_default().push(format!(
                    "Ensure this field has no more than {TITLE_MAX_LEN} characters."
                ));
            }
        }
        if let Some(price) = self.price {
            if price < 0 {
                errors
                    .entry("price".into())
                    .or_default()
                    .push("Ensure this value is greater than or equal to 0.".into());
            } else if price > MAX_PRICE {
                errors
                    .entry("price".into())
                    .or_default()
                    .push("Ensure that there are no more than 6 digits in total.".into());
            }
        }
        if let Some(inventory) = self.inventory {
            if inventory < 0 {
                errors
                    .entry("inventory".into())
                    .or_default()
                    .push("Ensure this value is greater than or equal to 0.".into());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetFeaturedRequest {
    pub menuitem_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuItemList {
    pub items: Vec<MenuItem>,
}
