use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::dto::products::{
    CreateProductRequest, ProductList, ProductWithVariants, UpdateProductRequest, VariantInput,
};
use crate::{
    audit::log_audit,
    entity::{
        product_variants::{
            ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
            Model as VariantModel,
        },
        products::{ActiveModel as ProductActive, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductVariant},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Pick the variant a selection refers to. An explicit pack size must match
/// exactly; with no selection the default-flagged variant wins, then the
/// first one. Selection state is per product, so callers pass only that
/// product's variants and nothing can leak between siblings.
pub fn resolve_variant<'a>(
    variants: &'a [ProductVariant],
    selected: Option<&str>,
) -> Option<&'a ProductVariant> {
    match selected {
        Some(size) => variants.iter().find(|v| v.pack_size == size),
        None => variants
            .iter()
            .find(|v| v.is_default)
            .or_else(|| variants.first()),
    }
}

/// Force the "exactly one default" shape on incoming variants: the first
/// flagged entry keeps the flag, everything else loses it, and when nothing
/// is flagged the first entry becomes the default.
pub fn normalize_default_flags(variants: &mut [VariantInput]) {
    if variants.is_empty() {
        return;
    }
    let keep = variants.iter().position(|v| v.is_default).unwrap_or(0);
    for (idx, variant) in variants.iter_mut().enumerate() {
        variant.is_default = idx == keep;
    }
}

pub fn validate_variants(variants: &[VariantInput]) -> Result<(), String> {
    if variants.is_empty() {
        return Err("at least one pack size is required".to_string());
    }
    for (idx, variant) in variants.iter().enumerate() {
        if variant.pack_size.trim().is_empty() {
            return Err("pack size must not be blank".to_string());
        }
        if variant.price <= 0 {
            return Err(format!("price must be positive for '{}'", variant.pack_size));
        }
        if variant.stock < 0 {
            return Err(format!("stock must not be negative for '{}'", variant.pack_size));
        }
        if variants[..idx]
            .iter()
            .any(|other| other.pack_size == variant.pack_size)
        {
            return Err(format!("duplicate pack size '{}'", variant.pack_size));
        }
    }
    Ok(())
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    list_products_filtered(state, query, false).await
}

pub async fn list_products_admin(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    list_products_filtered(state, query, true).await
}

async fn list_products_filtered(
    state: &AppState,
    query: ProductQuery,
    include_inactive: bool,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if !include_inactive {
        condition = condition.add(Column::IsActive.eq(true));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    if let Some(featured) = query.featured {
        condition = condition.add(Column::IsFeatured.eq(featured));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut variants_by_product = load_variants(state, products.iter().map(|p| p.id)).await?;

    let items = products
        .into_iter()
        .map(|model| {
            let variants = variants_by_product.remove(&model.id).unwrap_or_default();
            ProductWithVariants {
                product: product_from_entity(model),
                variants,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<ProductWithVariants>> {
    let model = Products::find_by_id(id).one(&state.orm).await?;
    let model = match model {
        Some(p) if p.is_active => p,
        _ => return Err(AppError::NotFound),
    };

    let mut variants_by_product = load_variants(state, std::iter::once(model.id)).await?;
    let variants = variants_by_product.remove(&model.id).unwrap_or_default();

    Ok(ApiResponse::success(
        "Product",
        ProductWithVariants {
            product: product_from_entity(model),
            variants,
        },
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    mut payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductWithVariants>> {
    ensure_admin(user)?;
    validate_variants(&payload.variants).map_err(AppError::BadRequest)?;
    normalize_default_flags(&mut payload.variants);

    let txn = state.orm.begin().await?;

    let product_id = Uuid::new_v4();
    let product = ProductActive {
        id: Set(product_id),
        name: Set(payload.name),
        category: Set(payload.category),
        unit: Set(payload.unit),
        description: Set(payload.description),
        image_url: Set(payload.image_url),
        benefits: Set(serde_json::json!(payload.benefits)),
        is_active: Set(payload.is_active),
        is_featured: Set(payload.is_featured),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let variants = insert_variants(&txn, product_id, payload.variants).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        ProductWithVariants {
            product: product_from_entity(product),
            variants,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductWithVariants>> {
    ensure_admin(user)?;

    if let Some(variants) = payload.variants.as_ref() {
        validate_variants(variants).map_err(AppError::BadRequest)?;
    }

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let txn = state.orm.begin().await?;

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(benefits) = payload.benefits {
        active.benefits = Set(serde_json::json!(benefits));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }

    let product = active.update(&txn).await?;

    let variants = match payload.variants {
        Some(mut inputs) => {
            normalize_default_flags(&mut inputs);
            // Wholesale replacement; cart and order lines keep their own
            // snapshots so dropping rows here cannot corrupt them.
            ProductVariants::delete_many()
                .filter(VariantCol::ProductId.eq(product.id))
                .exec(&txn)
                .await?;
            insert_variants(&txn, product.id, inputs).await?
        }
        None => ProductVariants::find()
            .filter(VariantCol::ProductId.eq(product.id))
            .order_by_asc(VariantCol::DisplayOrder)
            .all(&txn)
            .await?
            .into_iter()
            .map(variant_from_entity)
            .collect(),
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        ProductWithVariants {
            product: product_from_entity(product),
            variants,
        },
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn load_variants(
    state: &AppState,
    product_ids: impl Iterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, Vec<ProductVariant>>> {
    let ids: Vec<Uuid> = product_ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(ids))
        .order_by_asc(VariantCol::DisplayOrder)
        .order_by_asc(VariantCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.product_id)
            .or_default()
            .push(variant_from_entity(row));
    }
    Ok(grouped)
}

async fn insert_variants(
    txn: &sea_orm::DatabaseTransaction,
    product_id: Uuid,
    inputs: Vec<VariantInput>,
) -> AppResult<Vec<ProductVariant>> {
    let mut variants = Vec::with_capacity(inputs.len());
    for (idx, input) in inputs.into_iter().enumerate() {
        let variant = VariantActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            pack_size: Set(input.pack_size),
            price: Set(input.price),
            stock: Set(input.stock),
            is_default: Set(input.is_default),
            display_order: Set(idx as i32),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;
        variants.push(variant_from_entity(variant));
    }
    Ok(variants)
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        category: model.category,
        unit: model.unit,
        description: model.description,
        image_url: model.image_url,
        benefits: serde_json::from_value(model.benefits).unwrap_or_default(),
        is_active: model.is_active,
        is_featured: model.is_featured,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn variant_from_entity(model: VariantModel) -> ProductVariant {
    ProductVariant {
        id: model.id,
        product_id: model.product_id,
        pack_size: model.pack_size,
        price: model.price,
        stock: model.stock,
        is_default: model.is_default,
        display_order: model.display_order,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
