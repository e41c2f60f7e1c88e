use chrono::Utc;
use uuid::Uuid;

use roots_rope_api::dto::products::VariantInput;
use roots_rope_api::models::ProductVariant;
use roots_rope_api::services::product_service::{
    normalize_default_flags, resolve_variant, validate_variants,
};

fn variant(product_id: Uuid, pack_size: &str, price: i64, is_default: bool) -> ProductVariant {
    ProductVariant {
        id: Uuid::new_v4(),
        product_id,
        pack_size: pack_size.to_string(),
        price,
        stock: 10,
        is_default,
        display_order: 0,
        created_at: Utc::now(),
    }
}

fn input(pack_size: &str, is_default: bool) -> VariantInput {
    VariantInput {
        pack_size: pack_size.to_string(),
        price: 10000,
        stock: 5,
        is_default,
    }
}

#[test]
fn no_selection_resolves_to_default_flagged_variant() {
    let p = Uuid::new_v4();
    let variants = vec![
        variant(p, "250 g", 32500, false),
        variant(p, "500 g", 60000, true),
    ];

    let resolved = resolve_variant(&variants, None).expect("variant");
    assert_eq!(resolved.pack_size, "500 g");
    assert_eq!(resolved.price, 60000);
}

#[test]
fn no_selection_falls_back_to_first_variant_without_flag() {
    let p = Uuid::new_v4();
    let variants = vec![
        variant(p, "250 g", 32500, false),
        variant(p, "500 g", 60000, false),
    ];

    let resolved = resolve_variant(&variants, None).expect("variant");
    assert_eq!(resolved.pack_size, "250 g");
}

#[test]
fn explicit_selection_wins_over_default_flag() {
    let p = Uuid::new_v4();
    let variants = vec![
        variant(p, "250 g", 32500, true),
        variant(p, "500 g", 60000, false),
    ];

    let resolved = resolve_variant(&variants, Some("500 g")).expect("variant");
    assert_eq!(resolved.price, 60000);
}

#[test]
fn unknown_selection_resolves_to_nothing() {
    let p = Uuid::new_v4();
    let variants = vec![variant(p, "250 g", 32500, true)];

    assert!(resolve_variant(&variants, Some("2 kg")).is_none());
}

#[test]
fn empty_variant_list_resolves_to_nothing() {
    assert!(resolve_variant(&[], None).is_none());
}

#[test]
fn selection_is_scoped_per_product() {
    // Selecting "1 kg" on one product must not bleed into a sibling that is
    // resolved with no selection of its own.
    let oil = Uuid::new_v4();
    let jaggery = Uuid::new_v4();
    let oil_variants = vec![
        variant(oil, "500 ml", 28500, true),
        variant(oil, "1 L", 54000, false),
    ];
    let jaggery_variants = vec![
        variant(jaggery, "500 g", 12000, true),
        variant(jaggery, "1 kg", 22000, false),
    ];

    let picked = resolve_variant(&oil_variants, Some("1 L")).expect("variant");
    assert_eq!(picked.price, 54000);

    let sibling = resolve_variant(&jaggery_variants, None).expect("variant");
    assert_eq!(sibling.pack_size, "500 g");
    assert_eq!(sibling.price, 12000);
}

#[test]
fn normalize_keeps_first_flagged_default_only() {
    let mut inputs = vec![
        input("250 g", false),
        input("500 g", true),
        input("1 kg", true),
    ];
    normalize_default_flags(&mut inputs);

    let flags: Vec<bool> = inputs.iter().map(|v| v.is_default).collect();
    assert_eq!(flags, vec![false, true, false]);
}

#[test]
fn normalize_defaults_first_entry_when_nothing_flagged() {
    let mut inputs = vec![input("250 g", false), input("500 g", false)];
    normalize_default_flags(&mut inputs);

    assert!(inputs[0].is_default);
    assert!(!inputs[1].is_default);
}

#[test]
fn validate_rejects_empty_and_duplicate_pack_sizes() {
    assert!(validate_variants(&[]).is_err());

    let dup = vec![input("500 g", true), input("500 g", false)];
    let err = validate_variants(&dup).unwrap_err();
    assert!(err.contains("duplicate"));
}

#[test]
fn validate_rejects_bad_price_and_stock() {
    let mut bad_price = vec![input("500 g", true)];
    bad_price[0].price = 0;
    assert!(validate_variants(&bad_price).is_err());

    let mut bad_stock = vec![input("500 g", true)];
    bad_stock[0].stock = -1;
    assert!(validate_variants(&bad_stock).is_err());
}
