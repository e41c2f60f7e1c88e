use roots_rope_api::{
    db::{create_pool, orm_from_pool, run_migrations},
    dto::auth::{GuestCartLine, LoginRequest, RegisterRequest},
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    dto::products::{CreateProductRequest, VariantInput},
    middleware::auth::AuthUser,
    payments::RazorpayClient,
    routes::admin::{InventoryAdjustRequest, LowStockQuery, UpdateOrderStatusRequest},
    routes::params::Pagination,
    services::{admin_service, auth_service, cart_service, product_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow: admin seeds a product with two pack sizes; a customer
// builds a cart, logs in with a guest cart that has to merge, and an admin
// walks an order through its status lifecycle and the inventory screens.
#[tokio::test]
async fn storefront_cart_merge_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    // login_user issues a token.
    unsafe { std::env::set_var("JWT_SECRET", "integration-test-secret") };

    let state = setup_state(&database_url).await?;

    let admin_id = create_admin(&state, "admin@rootsandrope.in").await?;
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Seed a product through the admin service so flag normalization and
    // display order are exercised too.
    let created = product_service::create_product(
        &state,
        &auth_admin,
        CreateProductRequest {
            name: "Cold-Pressed Groundnut Oil".into(),
            category: "oils".into(),
            unit: "ml".into(),
            description: Some("Wood-pressed, single origin".into()),
            image_url: None,
            benefits: vec!["No refining".into()],
            is_active: true,
            is_featured: true,
            variants: vec![
                VariantInput {
                    pack_size: "500 ml".into(),
                    price: 28500,
                    stock: 10,
                    is_default: false,
                },
                VariantInput {
                    pack_size: "1 L".into(),
                    price: 54000,
                    stock: 8,
                    is_default: true,
                },
            ],
        },
    )
    .await?;
    let created = created.data.expect("created product");
    let product_id = created.product.id;
    let litre_variant = created
        .variants
        .iter()
        .find(|v| v.pack_size == "1 L")
        .expect("1 L variant")
        .clone();

    let registered = auth_service::register_user(
        &state.pool,
        RegisterRequest {
            email: "customer@example.com".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    let customer_id = registered.data.expect("registered user").id;
    let auth_user = AuthUser {
        user_id: customer_id,
        role: "user".into(),
    };

    // Adding with no pack size must land on the default-flagged variant.
    let default_line = cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id,
            pack_size: None,
            quantity: 1,
        },
    )
    .await?
    .data
    .expect("cart line");
    assert_eq!(default_line.pack_size, "1 L");
    assert_eq!(default_line.unit_price, 54000);

    // Explicit pack size, then the quantity walk:
    // qty 2 -> 3 -> 0 removes the line entirely.
    let small_line = cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id,
            pack_size: Some("500 ml".into()),
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("cart line");
    assert_eq!(small_line.unit_price, 28500);

    let bumped = cart_service::update_cart_item(
        &state.pool,
        &auth_user,
        small_line.id,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?;
    assert_eq!(bumped.data.expect("cart line").quantity, 3);

    let removed = cart_service::update_cart_item(
        &state.pool,
        &auth_user,
        small_line.id,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;
    assert_eq!(removed.message, "Removed");

    let cart = cart_service::list_cart(&state.pool, &auth_user)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.subtotal, 54000);

    // Login with a guest cart: the "1 L" line exists on both sides and must
    // settle on the max quantity, the "500 ml" line is appended.
    let guest_cart = vec![
        GuestCartLine {
            product_id,
            pack_size: "1 L".into(),
            quantity: 3,
        },
        GuestCartLine {
            product_id,
            pack_size: "500 ml".into(),
            quantity: 2,
        },
    ];
    let login = auth_service::login_user(
        &state.pool,
        LoginRequest {
            email: "customer@example.com".into(),
            password: "secret123".into(),
            guest_cart: guest_cart.clone(),
        },
    )
    .await?;
    assert!(login.data.expect("login").token.starts_with("Bearer "));

    let cart = cart_service::list_cart(&state.pool, &auth_user)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items.len(), 2);
    let qty_of = |size: &str| {
        cart.items
            .iter()
            .find(|i| i.pack_size == size)
            .map(|i| i.quantity)
    };
    assert_eq!(qty_of("1 L"), Some(3));
    assert_eq!(qty_of("500 ml"), Some(2));
    assert_eq!(cart.subtotal, 3 * 54000 + 2 * 28500);

    // A second login with the same guest cart must not change quantities.
    auth_service::login_user(
        &state.pool,
        LoginRequest {
            email: "customer@example.com".into(),
            password: "secret123".into(),
            guest_cart,
        },
    )
    .await?;
    let cart = cart_service::list_cart(&state.pool, &auth_user)
        .await?
        .data
        .expect("cart");
    assert_eq!(qty_of_items(&cart.items, "1 L"), Some(3));
    assert_eq!(qty_of_items(&cart.items, "500 ml"), Some(2));

    // Admin order lifecycle on a seeded pending order.
    let order_id = insert_pending_order(&state, customer_id).await?;

    let err = admin_service::update_order_status(
        &state,
        &auth_admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await;
    assert!(err.is_err(), "pending -> shipped must be rejected");

    let confirmed = admin_service::update_order_status(
        &state,
        &auth_admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "confirmed".into(),
        },
    )
    .await?;
    assert_eq!(confirmed.data.expect("order").status, "confirmed");

    // Inventory: draw the 1 L variant down to 1 and expect it on the
    // low-stock screen.
    admin_service::adjust_inventory(
        &state,
        &auth_admin,
        litre_variant.id,
        InventoryAdjustRequest { delta: -7 },
    )
    .await?;

    let low = admin_service::list_low_stock(
        &state,
        &auth_admin,
        LowStockQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(20),
            },
            threshold: Some(5),
        },
    )
    .await?;
    assert!(
        low.data
            .expect("low stock")
            .items
            .iter()
            .any(|entry| entry.variant.id == litre_variant.id),
        "expected the 1 L variant in the low-stock list"
    );

    let err = admin_service::adjust_inventory(
        &state,
        &auth_admin,
        litre_variant.id,
        InventoryAdjustRequest { delta: -100 },
    )
    .await;
    assert!(err.is_err(), "stock must not go negative");

    Ok(())
}

fn qty_of_items(items: &[roots_rope_api::models::CartItem], size: &str) -> Option<i32> {
    items
        .iter()
        .find(|i| i.pack_size == size)
        .map(|i| i.quantity)
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = orm_from_pool(&pool);
    run_migrations(&orm).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, product_variants, products, audit_logs, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(AppState {
        pool,
        orm,
        payments: RazorpayClient::new("rzp_test_key", "rzp_test_secret"),
    })
}

async fn create_admin(state: &AppState, email: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, 'admin') RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind("dummy")
    .fetch_one(&state.pool)
    .await?;
    Ok(row.0)
}

async fn insert_pending_order(state: &AppState, user_id: Uuid) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO orders
            (id, user_id, invoice_number, total_amount, status, payment_status,
             ship_name, ship_phone, ship_address, ship_city, ship_state, ship_pincode)
        VALUES ($1, $2, $3, $4, 'pending', 'created',
                'Asha', '9999999999', '12 Canal Road', 'Madurai', 'TN', '625001')
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(format!("RRN-TEST-{}", &id.to_string()[..8]))
    .bind(54000_i64)
    .execute(&state.pool)
    .await?;
    Ok(id)
}
