//! Derived-value rule across sequences of ledger edits.

mod support;

use dealdesk_core::OpportunityDraft;
use dealdesk_domain::{LineItemId, Opportunity};
use rust_decimal::Decimal;
use support::{dec, opportunity, today};

fn expected_total(draft: &OpportunityDraft) -> Decimal {
    draft
        .ledger()
        .items()
        .iter()
        .map(|item| Decimal::from(item.quantity) * item.unit_price)
        .sum()
}

#[test]
fn value_tracks_grand_total_through_adds_and_removes() {
    let mut draft = OpportunityDraft::open_for_create("Novo", today());
    draft.set_value(dec("42"));

    let inputs = [
        ("prod-a", Some(1), Some("10.00")),
        ("prod-b", Some(3), Some("0.99")),
        ("prod-c", Some(0), None),
        ("prod-d", Some(12), Some("1250.125")),
        ("prod-e", None, Some("-5")),
    ];

    let mut ids: Vec<LineItemId> = Vec::new();
    for (product, quantity, price) in inputs {
        let id = draft.add_line_item(Some(product), quantity, price.map(dec)).unwrap();
        ids.push(id);
        assert_eq!(draft.value(), expected_total(&draft));
    }

    // Remove from the middle, then the ends.
    for index in [2, 0, 2] {
        let id = ids.remove(index);
        let request = draft.request_line_item_removal(&id).unwrap();
        draft.confirm_line_item_removal(request).unwrap();
        assert_eq!(draft.value(), expected_total(&draft));
    }

    for id in ids {
        let request = draft.request_line_item_removal(&id).unwrap();
        draft.confirm_line_item_removal(request);
    }
    assert!(draft.ledger().is_empty());
    assert_eq!(draft.value(), dec("42"));
}

#[test]
fn add_then_remove_single_item_restores_previous_value() {
    for manual in ["0", "1999.99", "-10"] {
        let mut draft = OpportunityDraft::open_for_create("Novo", today());
        draft.set_field("value", manual).unwrap();

        let id = draft.add_line_item(Some("prod-a"), Some(7), Some(dec("3.30"))).unwrap();
        assert_eq!(draft.value(), dec("23.10"));

        let request = draft.request_line_item_removal(&id).unwrap();
        draft.confirm_line_item_removal(request);
        assert_eq!(draft.value(), dec(manual));
    }
}

#[test]
fn manual_edit_is_overridden_by_next_ledger_change() {
    let mut draft = OpportunityDraft::open_for_create("Novo", today());
    draft.add_line_item(Some("prod-a"), Some(1), Some(dec("100")));

    draft.set_value(dec("5000"));
    assert_eq!(draft.value(), dec("5000"));

    draft.add_line_item(Some("prod-b"), Some(1), Some(dec("1")));
    assert_eq!(draft.value(), dec("101"));
}

#[test]
fn blank_product_leaves_value_untouched() {
    let mut draft = OpportunityDraft::open_for_create("Novo", today());
    draft.set_value(dec("77"));

    assert!(draft.add_line_item(None, Some(2), Some(dec("10"))).is_none());
    assert!(draft.add_line_item(Some(""), Some(2), Some(dec("10"))).is_none());
    assert_eq!(draft.value(), dec("77"));
}

#[test]
fn emptying_loaded_ledger_reverts_to_persisted_value() {
    let persisted: Opportunity = opportunity("opp-1", "Novo", "640");
    let mut draft = OpportunityDraft::open_for_edit(&persisted);
    draft.load_line_items(vec![dealdesk_domain::LineItem {
        id: LineItemId::persisted("li-1"),
        opportunity_id: Some("opp-1".into()),
        product_id: "prod-a".into(),
        product_name: None,
        quantity: 2,
        unit_price: dec("320"),
    }]);

    let id = LineItemId::persisted("li-1");
    let request = draft.request_line_item_removal(&id).unwrap();
    draft.confirm_line_item_removal(request);

    assert_eq!(draft.value(), dec("640"));
}
