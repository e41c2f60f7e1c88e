use chrono::Utc;
use uuid::Uuid;

use roots_rope_api::dto::auth::GuestCartLine;
use roots_rope_api::models::CartItem;
use roots_rope_api::services::cart_service::{cart_subtotal, merge_guest_cart};

fn cart_item(product_id: Uuid, pack_size: &str, quantity: i32, unit_price: i64) -> CartItem {
    CartItem {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        product_id,
        pack_size: pack_size.to_string(),
        quantity,
        unit_price,
        product_name: "Cold-Pressed Groundnut Oil".to_string(),
        image_url: None,
        created_at: Utc::now(),
    }
}

fn guest_line(product_id: Uuid, pack_size: &str, quantity: i32) -> GuestCartLine {
    GuestCartLine {
        product_id,
        pack_size: pack_size.to_string(),
        quantity,
    }
}

#[test]
fn merge_keeps_max_quantity_not_sum() {
    // Guest cart {P1/"500 g", qty 1}; the account already holds qty 3.
    // Logging in must land on 3, never 4.
    let p1 = Uuid::new_v4();
    let existing = vec![cart_item(p1, "500 g", 3, 12000)];
    let guest = vec![guest_line(p1, "500 g", 1)];

    let merged = merge_guest_cart(&existing, &guest);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].quantity, 3);
}

#[test]
fn merge_takes_guest_quantity_when_larger() {
    let p1 = Uuid::new_v4();
    let existing = vec![cart_item(p1, "500 g", 1, 12000)];
    let guest = vec![guest_line(p1, "500 g", 5)];

    let merged = merge_guest_cart(&existing, &guest);
    assert_eq!(merged[0].quantity, 5);
}

#[test]
fn merge_appends_guest_only_lines_unchanged() {
    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    let existing = vec![cart_item(p1, "500 g", 2, 12000)];
    let guest = vec![guest_line(p2, "250 ml", 4)];

    let merged = merge_guest_cart(&existing, &guest);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].product_id, p2);
    assert_eq!(merged[0].quantity, 4);
}

#[test]
fn merge_distinguishes_pack_sizes_of_same_product() {
    // (product_id, pack_size) is the key; same product in another size is a
    // different line.
    let p1 = Uuid::new_v4();
    let existing = vec![cart_item(p1, "500 g", 2, 12000)];
    let guest = vec![guest_line(p1, "1 kg", 1)];

    let merged = merge_guest_cart(&existing, &guest);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].pack_size, "1 kg");
    assert_eq!(merged[0].quantity, 1);
}

#[test]
fn merge_collapses_duplicate_guest_keys_to_max() {
    let p1 = Uuid::new_v4();
    let guest = vec![guest_line(p1, "500 g", 2), guest_line(p1, "500 g", 3)];

    let merged = merge_guest_cart(&[], &guest);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].quantity, 3);
}

#[test]
fn merge_drops_non_positive_quantities() {
    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    let guest = vec![guest_line(p1, "500 g", 0), guest_line(p2, "250 ml", -2)];

    let merged = merge_guest_cart(&[], &guest);
    assert!(merged.is_empty());
}

#[test]
fn merge_is_idempotent_across_repeated_logins() {
    // Running the merge result through a second merge with the same guest
    // payload changes nothing; that is the point of max-over-sum.
    let p1 = Uuid::new_v4();
    let guest = vec![guest_line(p1, "500 g", 2)];

    let first = merge_guest_cart(&[], &guest);
    let as_existing: Vec<CartItem> = first
        .iter()
        .map(|line| cart_item(line.product_id, &line.pack_size, line.quantity, 12000))
        .collect();
    let second = merge_guest_cart(&as_existing, &guest);

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].quantity, 2);
}

#[test]
fn subtotal_sums_snapshotted_prices() {
    let items = vec![
        cart_item(Uuid::new_v4(), "500 g", 2, 12000),
        cart_item(Uuid::new_v4(), "1 L", 3, 54000),
    ];
    assert_eq!(cart_subtotal(&items), 2 * 12000 + 3 * 54000);
}

#[test]
fn subtotal_of_empty_cart_is_zero() {
    assert_eq!(cart_subtotal(&[]), 0);
}
