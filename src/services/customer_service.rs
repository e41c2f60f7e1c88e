use crate::{
    audit::log_audit,
    db::DbPool,
    dto::customers::{CustomerList, CustomerSummary, UpdateProfileRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

const USER_COLUMNS: &str =
    "id, email, role, full_name, phone, address, city, state, pincode, created_at";

pub async fn get_profile(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let profile: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?;

    let profile = profile.ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", profile, None))
}

/// Update the address block on the profile. Fields left out of the payload
/// keep their current values.
pub async fn update_profile(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let profile: Option<User> = sqlx::query_as(&format!(
        r#"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            address = COALESCE($4, address),
            city = COALESCE($5, city),
            state = COALESCE($6, state),
            pincode = COALESCE($7, pincode)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.user_id)
    .bind(payload.full_name)
    .bind(payload.phone)
    .bind(payload.address)
    .bind(payload.city)
    .bind(payload.state)
    .bind(payload.pincode)
    .fetch_optional(pool)
    .await?;

    let profile = profile.ok_or(AppError::NotFound)?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "profile_update",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Profile updated",
        profile,
        Some(Meta::empty()),
    ))
}

pub async fn list_customers(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let items: Vec<CustomerSummary> = sqlx::query_as(
        r#"
        SELECT u.id, u.email, u.full_name, u.phone, u.city, u.created_at,
               COUNT(o.id) AS order_count
        FROM users u
        LEFT JOIN orders o ON o.user_id = u.id
        WHERE u.role = 'user'
        GROUP BY u.id
        ORDER BY u.created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'user'")
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(meta),
    ))
}
