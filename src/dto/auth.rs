use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// One line of the cart a visitor built before signing in. Only the key and
/// the quantity are trusted; prices are re-resolved server-side.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GuestCartLine {
    pub product_id: Uuid,
    pub pack_size: String,
    pub quantity: i32,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Merged into the account cart exactly once, during this login.
    #[serde(default)]
    pub guest_cart: Vec<GuestCartLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
