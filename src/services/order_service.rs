use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CheckoutRequest, CheckoutResponse, OrderList, OrderWithItems, PaymentHandoff,
        VerifyPaymentRequest,
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, payment_status},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Turn the cart into an order. Order row, line items, stock decrements and
/// the cart wipe all commit in one transaction, so a crash can never leave
/// an order without its items. Totals come from the cart's snapshotted unit
/// prices, not from live product rows.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    validate_shipping(&payload)?;

    let txn = state.orm.begin().await?;

    let cart_rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart_rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut total_amount: i64 = 0;
    for row in &cart_rows {
        let variant = ProductVariants::find()
            .filter(
                Condition::all()
                    .add(VariantCol::ProductId.eq(row.product_id))
                    .add(VariantCol::PackSize.eq(row.pack_size.clone())),
            )
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let variant = match variant {
            Some(v) => v,
            None => {
                return Err(AppError::BadRequest(format!(
                    "{} ({}) is no longer available",
                    row.product_name, row.pack_size
                )));
            }
        };
        if variant.stock < row.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {} ({})",
                row.product_name, row.pack_size
            )));
        }
        total_amount += row.unit_price * i64::from(row.quantity);
    }

    let order_id = Uuid::new_v4();
    let invoice_number = build_invoice_number(order_id);

    // Provider order first: if the gateway is down the transaction drops and
    // no half-checked-out order row survives.
    let provider_order = state
        .payments
        .create_order(total_amount, "INR", &invoice_number)
        .await
        .map_err(|e| AppError::PaymentGateway(e.to_string()))?;

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        invoice_number: Set(invoice_number),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_status: Set(payment_status::CREATED.into()),
        provider_order_id: Set(Some(provider_order.id.clone())),
        provider_payment_id: Set(None),
        ship_name: Set(payload.ship_name),
        ship_phone: Set(payload.ship_phone),
        ship_address: Set(payload.ship_address),
        ship_city: Set(payload.ship_city),
        ship_state: Set(payload.ship_state),
        ship_pincode: Set(payload.ship_pincode),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();

    for row in &cart_rows {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            product_name: Set(row.product_name.clone()),
            pack_size: Set(row.pack_size.clone()),
            quantity: Set(row.quantity),
            unit_price: Set(row.unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(order_item_from_entity(item));

        ProductVariants::update_many()
            .col_expr(
                VariantCol::Stock,
                Expr::col(VariantCol::Stock).sub(row.quantity),
            )
            .filter(
                Condition::all()
                    .add(VariantCol::ProductId.eq(row.product_id))
                    .add(VariantCol::PackSize.eq(row.pack_size.clone())),
            )
            .exec(&txn)
            .await?;
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "provider_order_id": provider_order.id,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse {
            order: order_from_entity(order),
            items: order_items,
            payment: PaymentHandoff {
                provider_order_id: provider_order.id,
                amount: provider_order.amount,
                currency: provider_order.currency,
                key_id: state.payments.key_id().to_string(),
            },
        },
        Some(Meta::empty()),
    ))
}

/// Record the provider callback for an order. The three fields from the
/// widget are checked server-side against the key secret; nothing the client
/// computed is trusted. Once the signature checks out, any failure to
/// persist is reported as the captured-but-unrecorded case so support can
/// reconcile by payment id instead of the customer paying twice.
pub async fn record_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_status == payment_status::PAID {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    if order.provider_order_id.as_deref() != Some(payload.razorpay_order_id.as_str()) {
        return Err(AppError::BadRequest(
            "payment does not belong to this order".into(),
        ));
    }

    if !state.payments.verify_checkout_signature(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    ) {
        drop(txn);
        if let Err(err) = log_audit(
            &state.pool,
            Some(user.user_id),
            "payment_rejected",
            Some("orders"),
            Some(serde_json::json!({
                "order_id": id,
                "provider_payment_id": payload.razorpay_payment_id,
            })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
        return Err(AppError::PaymentSignature);
    }

    let mut active: OrderActive = order.into();
    active.payment_status = Set(payment_status::PAID.into());
    active.status = Set(OrderStatus::Confirmed.as_str().into());
    active.provider_payment_id = Set(Some(payload.razorpay_payment_id.clone()));
    active.paid_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());

    // The money has already moved; from here on a database hiccup must not
    // look like an ordinary retryable error.
    let order = match active.update(&txn).await {
        Ok(o) => o,
        Err(err) => {
            tracing::error!(error = %err, order_id = %id, "verified payment could not be recorded");
            return Err(AppError::PaymentNotRecorded(payload.razorpay_payment_id));
        }
    };
    if let Err(err) = txn.commit().await {
        tracing::error!(error = %err, order_id = %id, "verified payment could not be recorded");
        return Err(AppError::PaymentNotRecorded(payload.razorpay_payment_id));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "payment_recorded",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "provider_payment_id": order.provider_payment_id,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

fn validate_shipping(payload: &CheckoutRequest) -> Result<(), AppError> {
    let fields = [
        ("name", &payload.ship_name),
        ("phone", &payload.ship_phone),
        ("address", &payload.ship_address),
        ("city", &payload.ship_city),
        ("state", &payload.ship_state),
        ("pincode", &payload.ship_pincode),
    ];
    for (label, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "shipping {label} must not be empty"
            )));
        }
    }
    Ok(())
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        invoice_number: model.invoice_number,
        total_amount: model.total_amount,
        status: model.status,
        payment_status: model.payment_status,
        provider_order_id: model.provider_order_id,
        provider_payment_id: model.provider_payment_id,
        ship_name: model.ship_name,
        ship_phone: model.ship_phone,
        ship_address: model.ship_address,
        ship_city: model.ship_city,
        ship_state: model.ship_state,
        ship_pincode: model.ship_pincode,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        pack_size: model.pack_size,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("RRN-{}-{}", date, short)
}
