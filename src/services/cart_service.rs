use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::auth::GuestCartLine,
    dto::cart::{AddToCartRequest, CartList, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, ProductVariant},
    response::{ApiResponse, Meta},
    services::product_service::resolve_variant,
};

/// Subtotal over the snapshotted unit prices. Live product prices are never
/// consulted once a line is in the cart.
pub fn cart_subtotal(items: &[CartItem]) -> i64 {
    items
        .iter()
        .map(|item| item.unit_price * i64::from(item.quantity))
        .sum()
}

/// Combine a guest cart with the account cart at login.
///
/// Lines match on (product_id, pack_size). A key present on both sides keeps
/// the maximum of the two quantities, not the sum, so logging in twice with
/// the same guest cart cannot double anything. Guest-only keys come through
/// unchanged; account-only keys are left alone (they are not in the returned
/// set). Non-positive guest quantities are dropped.
pub fn merge_guest_cart(existing: &[CartItem], guest: &[GuestCartLine]) -> Vec<GuestCartLine> {
    let mut merged: Vec<GuestCartLine> = Vec::new();

    for line in guest {
        if line.quantity <= 0 {
            continue;
        }
        if let Some(prev) = merged
            .iter_mut()
            .find(|m| m.product_id == line.product_id && m.pack_size == line.pack_size)
        {
            // Duplicate keys inside the guest payload collapse to the max too.
            prev.quantity = prev.quantity.max(line.quantity);
            continue;
        }
        let account_qty = existing
            .iter()
            .find(|item| item.product_id == line.product_id && item.pack_size == line.pack_size)
            .map(|item| item.quantity);
        merged.push(GuestCartLine {
            product_id: line.product_id,
            pack_size: line.pack_size.clone(),
            quantity: account_qty.map_or(line.quantity, |q| q.max(line.quantity)),
        });
    }

    merged
}

#[derive(FromRow)]
struct CartProductRow {
    name: String,
    image_url: Option<String>,
    is_active: bool,
}

async fn product_for_cart(
    conn: &mut sqlx::PgConnection,
    product_id: Uuid,
) -> AppResult<Option<(CartProductRow, Vec<ProductVariant>)>> {
    let product: Option<CartProductRow> =
        sqlx::query_as("SELECT name, image_url, is_active FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(product) = product else {
        return Ok(None);
    };
    if !product.is_active {
        return Ok(None);
    }

    let variants: Vec<ProductVariant> = sqlx::query_as(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY display_order, created_at",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some((product, variants)))
}

async fn upsert_line(
    conn: &mut sqlx::PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    variant: &ProductVariant,
    product: &CartProductRow,
    quantity: i32,
) -> AppResult<CartItem> {
    let item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, pack_size, quantity, unit_price, product_name, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, product_id, pack_size)
        DO UPDATE SET quantity = EXCLUDED.quantity,
                      unit_price = EXCLUDED.unit_price,
                      product_name = EXCLUDED.product_name,
                      image_url = EXCLUDED.image_url
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(product_id)
    .bind(&variant.pack_size)
    .bind(quantity)
    .bind(variant.price)
    .bind(&product.name)
    .bind(&product.image_url)
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}

pub async fn list_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let items: Vec<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(pool)
            .await?;

    let subtotal = cart_subtotal(&items);
    Ok(ApiResponse::success(
        "OK",
        CartList { items, subtotal },
        Some(Meta::empty()),
    ))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let mut conn = pool.acquire().await?;
    let Some((product, variants)) = product_for_cart(&mut conn, payload.product_id).await? else {
        return Err(AppError::BadRequest("product not found".to_string()));
    };

    let variant = resolve_variant(&variants, payload.pack_size.as_deref()).ok_or_else(|| {
        AppError::BadRequest(match payload.pack_size.as_deref() {
            Some(size) => format!("unknown pack size '{size}'"),
            None => "product has no variants".to_string(),
        })
    })?;

    let item = upsert_line(
        &mut conn,
        user.user_id,
        payload.product_id,
        variant,
        &product,
        payload.quantity,
    )
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({
            "product_id": payload.product_id,
            "pack_size": item.pack_size,
            "quantity": payload.quantity,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", item, None))
}

/// Set the absolute quantity of a cart line. Zero deletes the line; a
/// zero-quantity row never persists.
pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity must not be negative".to_string(),
        ));
    }

    let item: Option<CartItem> = if payload.quantity == 0 {
        sqlx::query_as("DELETE FROM cart_items WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(item_id)
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?
    } else {
        sqlx::query_as(
            "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(item_id)
        .bind(user.user_id)
        .bind(payload.quantity)
        .fetch_optional(pool)
        .await?
    };

    let item = item.ok_or(AppError::NotFound)?;

    let message = if payload.quantity == 0 { "Removed" } else { "OK" };
    Ok(ApiResponse::success(message, item, None))
}

pub async fn remove_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": result.rows_affected() }),
        Some(Meta::empty()),
    ))
}

/// Fold the guest cart into the account cart. Called from the login path
/// only, so it runs exactly once per login transition; token validation on
/// later requests never reaches this. Guest lines pointing at products or
/// pack sizes that no longer exist are skipped, and prices are re-resolved
/// here rather than trusted from the client.
pub async fn merge_on_login(
    pool: &DbPool,
    user_id: Uuid,
    guest: &[GuestCartLine],
) -> AppResult<usize> {
    if guest.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    let existing: Vec<CartItem> = sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

    let mut merged_count = 0usize;
    for line in merge_guest_cart(&existing, guest) {
        let Some((product, variants)) = product_for_cart(&mut tx, line.product_id).await? else {
            tracing::debug!(product_id = %line.product_id, "skipping guest cart line: product gone");
            continue;
        };
        let Some(variant) = resolve_variant(&variants, Some(line.pack_size.as_str())) else {
            tracing::debug!(
                product_id = %line.product_id,
                pack_size = %line.pack_size,
                "skipping guest cart line: pack size gone"
            );
            continue;
        };

        upsert_line(
            &mut tx,
            user_id,
            line.product_id,
            variant,
            &product,
            line.quantity,
        )
        .await?;
        merged_count += 1;
    }

    tx.commit().await?;
    Ok(merged_count)
}
