//! JSON representations of the persisted resources.
//!
//! Related rows are embedded the way clients read them: a menu item carries its category,
//! cart rows and order lines carry their menu item, an order carries its customer, crew and
//! lines. Money values are integers in minor currency units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{categories, orders::OrderStatus, users};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User {
            id: model.id,
            username: model.username,
            email: model.email,
        }
    }
}

/// The caller's own identity, roles included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Me {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub title: String,
    pub slug: String,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Category {
            id: model.id,
            title: model.title,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub id: i32,
    pub title: String,
    pub price: i64,
    pub inventory: i32,
    pub featured: bool,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: i32,
    pub menuitem: MenuItem,
    pub quantity: i32,
    pub unit_price: i64,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i32,
    pub menuitem: MenuItem,
    pub quantity: i32,
    pub unit_price: i64,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i32,
    pub user: User,
    pub delivery_crew: Option<User>,
    pub status: OrderStatus,
    pub total: i64,
    pub date: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}
