use roots_rope_api::models::OrderStatus;

#[test]
fn forward_path_is_allowed_step_by_step() {
    use OrderStatus::*;
    let path = [Pending, Confirmed, Processing, Shipped, Delivered];
    for pair in path.windows(2) {
        assert!(
            pair[0].can_transition_to(pair[1]),
            "{} -> {} should be allowed",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn skipping_stages_is_rejected() {
    use OrderStatus::*;
    assert!(!Pending.can_transition_to(Shipped));
    assert!(!Pending.can_transition_to(Delivered));
    assert!(!Confirmed.can_transition_to(Delivered));
}

#[test]
fn backwards_movement_is_rejected() {
    use OrderStatus::*;
    assert!(!Delivered.can_transition_to(Shipped));
    assert!(!Shipped.can_transition_to(Processing));
    assert!(!Confirmed.can_transition_to(Pending));
}

#[test]
fn cancellation_is_only_possible_before_shipping() {
    use OrderStatus::*;
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Confirmed.can_transition_to(Cancelled));
    assert!(Processing.can_transition_to(Cancelled));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Delivered.can_transition_to(Cancelled));
}

#[test]
fn refunded_is_terminal() {
    use OrderStatus::*;
    for next in [
        Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded,
    ] {
        assert!(!Refunded.can_transition_to(next));
    }
}

#[test]
fn parse_and_as_str_round_trip() {
    use OrderStatus::*;
    for status in [
        Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded,
    ] {
        assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(OrderStatus::parse("paid"), None);
    assert_eq!(OrderStatus::parse(""), None);
}
