use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, ProductVariant};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VariantInput {
    pub pack_size: String,
    pub price: i64,
    pub stock: i32,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub variants: Vec<VariantInput>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub benefits: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    /// When present, replaces the variant set wholesale. Cart and order
    /// lines are unaffected because they carry their own snapshots.
    pub variants: Option<Vec<VariantInput>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductWithVariants {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductWithVariants>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockVariant {
    pub variant: ProductVariant,
    pub product_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockList {
    pub items: Vec<LowStockVariant>,
}
