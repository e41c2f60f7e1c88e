use roots_rope_api::payments::{RazorpayClient, verify_signature};

// HMAC-SHA256("order_MkQhgfnAqt1dDK|pay_MkQiLLSGH0xjRG", "test_key_secret"),
// hex-encoded.
const KNOWN_SIGNATURE: &str = "8a63d8a1e7bf72cf1e242df6187f75f99a4935761021e2bf7e8a9d3cd3eecf36";
const ORDER_ID: &str = "order_MkQhgfnAqt1dDK";
const PAYMENT_ID: &str = "pay_MkQiLLSGH0xjRG";
const SECRET: &str = "test_key_secret";

#[test]
fn accepts_known_good_signature() {
    assert!(verify_signature(SECRET, ORDER_ID, PAYMENT_ID, KNOWN_SIGNATURE));
}

#[test]
fn rejects_signature_under_wrong_secret() {
    assert!(!verify_signature(
        "some_other_secret",
        ORDER_ID,
        PAYMENT_ID,
        KNOWN_SIGNATURE
    ));
}

#[test]
fn rejects_tampered_payment_id() {
    assert!(!verify_signature(
        SECRET,
        ORDER_ID,
        "pay_AttackerControlled",
        KNOWN_SIGNATURE
    ));
}

#[test]
fn rejects_truncated_signature() {
    let truncated = &KNOWN_SIGNATURE[..KNOWN_SIGNATURE.len() - 2];
    assert!(!verify_signature(SECRET, ORDER_ID, PAYMENT_ID, truncated));
}

#[test]
fn second_vector_matches() {
    // HMAC-SHA256("order_00000000000001|pay_00000000000001",
    // "rzp_test_secret_0000"), hex-encoded.
    assert!(verify_signature(
        "rzp_test_secret_0000",
        "order_00000000000001",
        "pay_00000000000001",
        "77bafc7598e708d27717863e3e1545cc6f9cacbe49f92e2fcfd231a6db9e0a50"
    ));
}

#[test]
fn client_wrapper_uses_its_own_secret() {
    let client = RazorpayClient::new("rzp_test_key", SECRET);
    assert!(client.verify_checkout_signature(ORDER_ID, PAYMENT_ID, KNOWN_SIGNATURE));

    let other = RazorpayClient::new("rzp_test_key", "wrong");
    assert!(!other.verify_checkout_signature(ORDER_ID, PAYMENT_ID, KNOWN_SIGNATURE));
}
