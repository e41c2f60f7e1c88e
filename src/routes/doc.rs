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
        auth::{GuestCartLine, LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartList, UpdateCartItemRequest},
        customers::{CustomerList, CustomerSummary, UpdateProfileRequest},
        orders::{
            CheckoutRequest, CheckoutResponse, OrderList, OrderWithItems, PaymentHandoff,
            VerifyPaymentRequest,
        },
        products::{
            CreateProductRequest, LowStockList, LowStockVariant, ProductList, ProductWithVariants,
            UpdateProductRequest, VariantInput,
        },
    },
    models::{CartItem, Order, OrderItem, OrderStatus, Product, ProductVariant, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products, profile},
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
        products::list_products,
        products::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_cart_item,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::record_payment,
        orders::get_order,
        profile::get_profile,
        profile::update_profile,
        admin::list_products_admin,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_customers,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            Product,
            ProductVariant,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            GuestCartLine,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartList,
            CreateProductRequest,
            UpdateProductRequest,
            VariantInput,
            ProductWithVariants,
            ProductList,
            LowStockVariant,
            LowStockList,
            CheckoutRequest,
            CheckoutResponse,
            PaymentHandoff,
            VerifyPaymentRequest,
            OrderWithItems,
            OrderList,
            CustomerSummary,
            CustomerList,
            UpdateProfileRequest,
            admin::UpdateOrderStatusRequest,
            admin::InventoryAdjustRequest,
            admin::LowStockQuery,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductWithVariants>,
            ApiResponse<CartList>,
            ApiResponse<CartItem>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<CustomerList>,
            ApiResponse<User>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order and payment endpoints"),
        (name = "Profile", description = "Customer profile endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
