use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::{entity::orders::OrderStatus, models::Order};

/// Partial update of an order. Absent fields are left alone; `delivery_crew_id: null`
/// unassigns the crew.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatchOrderRequest {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>, nullable)]
    pub delivery_crew_id: Option<Option<i32>>,
}

impl PatchOrderRequest {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.delivery_crew_id.is_none()
    }
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
