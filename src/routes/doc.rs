use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartList},
        categories::{CategoryList, CategoryPatch, CategoryRequest},
        groups::{AddMemberRequest, MemberList},
        menu_items::{MenuItemList, MenuItemPatch, MenuItemRequest, SetFeaturedRequest},
        orders::{OrderList, PatchOrderRequest},
    },
    entity::orders::OrderStatus,
    error::ErrorData,
    models::{CartItem, Category, Me, MenuItem, Order, OrderItem, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, categories, groups, health, menu_items, orders},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        categories::list_categories,
        categories::create_category,
        categories::get_category,
        categories::replace_category,
        categories::update_category,
        categories::delete_category,
        menu_items::list_menu_items,
        menu_items::create_menu_item,
        menu_items::get_menu_item,
        menu_items::replace_menu_item,
        menu_items::update_menu_item,
        menu_items::delete_menu_item,
        menu_items::get_featured,
        menu_items::set_featured,
        cart::cart_list,
        cart::add_to_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        groups::list_managers,
        groups::add_manager,
        groups::remove_manager,
        groups::list_delivery_crew,
        groups::add_delivery_crew,
        groups::remove_delivery_crew
    ),
    components(
        schemas(
            User,
            Me,
            Category,
            MenuItem,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CategoryRequest,
            CategoryPatch,
            CategoryList,
            MenuItemRequest,
            MenuItemPatch,
            MenuItemList,
            SetFeaturedRequest,
            AddToCartRequest,
            CartList,
            PatchOrderRequest,
            OrderList,
            AddMemberRequest,
            MemberList,
            ErrorData,
            Meta,
            ApiResponse<Category>,
            ApiResponse<MenuItem>,
            ApiResponse<Order>,
            ApiResponse<CategoryList>,
            ApiResponse<MenuItemList>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and token endpoints"),
        (name = "Categories", description = "Menu categories"),
        (name = "Menu items", description = "Menu items and the item of the day"),
        (name = "Cart", description = "The caller's cart"),
        (name = "Orders", description = "Order placement and fulfilment"),
        (name = "Groups", description = "Manager and delivery crew membership"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
