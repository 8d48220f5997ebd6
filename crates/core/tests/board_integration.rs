//! Board controller behaviour against the in-memory store.

mod support;

use std::sync::Arc;

use dealdesk_core::{BoardController, LineItemsState, MoveOutcome, NoticeLevel, PipelineStore};
use dealdesk_domain::{DealDeskError, IntegrityWarning, LineItem, LineItemId};
use support::{dec, default_stages, opportunity, product, tenant, today, InMemoryPipelineStore};

async fn loaded_board(store: InMemoryPipelineStore) -> (Arc<InMemoryPipelineStore>, BoardController) {
    let store = Arc::new(store);
    let mut board = BoardController::new(store.clone(), tenant()).with_catalog(store.clone());
    board.load().await.unwrap();
    (store, board)
}

fn seeded() -> InMemoryPipelineStore {
    InMemoryPipelineStore::new().with_stages(default_stages()).with_opportunities(vec![
        opportunity("opp-1", "Novo", "1000"),
        opportunity("opp-2", "Ganho", "250.50"),
        opportunity("opp-3", "ganho", "49.50"),
    ])
}

#[tokio::test]
async fn load_groups_cards_by_stage_ignoring_case() {
    let (store, board) = loaded_board(seeded()).await;

    let won: Vec<&str> = board.by_stage("ganho").iter().map(|opp| opp.id.as_str()).collect();
    assert_eq!(won, vec!["opp-2", "opp-3"]);
    assert_eq!(board.column_total("Ganho"), dec("300.00"));

    let view = board.board_view();
    let names: Vec<&str> = view.columns.iter().map(|c| c.stage.name.as_str()).collect();
    assert_eq!(names, vec!["Novo", "Proposta", "Ganho", "Perdido"]);
    assert_eq!(view.total_value, dec("1300.00"));
    assert!(view.orphaned.is_empty());

    assert!(store.tenants_seen().iter().all(|t| t == "tenant-a"));
}

#[tokio::test]
async fn stage_load_failure_renders_zero_columns() {
    let store = seeded();
    store.fail("list_stages");
    let (_store, mut board) = loaded_board(store).await;

    assert!(board.stages().is_empty());
    assert!(board.board_view().columns.is_empty());
    assert_eq!(board.opportunities().len(), 3);

    let notices = board.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn drag_moves_card_immediately_and_keeps_it_on_success() {
    let (store, mut board) = loaded_board(seeded()).await;

    let stage_move = board.begin_move("opp-1", "ganho").unwrap().unwrap();
    assert_eq!(board.find_opportunity("opp-1").unwrap().stage, "Ganho", "canonical stage name");
    assert_eq!(board.by_stage("Ganho").len(), 3);
    assert_eq!(store.call_count("update_opportunity_stage"), 0);

    let result = stage_move.commit(board.store(), board.tenant()).await;
    let outcome = board.complete_move(stage_move, result);

    assert_eq!(outcome, MoveOutcome::Moved);
    assert_eq!(store.opportunity("opp-1").unwrap().stage, "Ganho");
    assert!(board.drain_notices().is_empty());
}

#[tokio::test]
async fn failed_drag_rolls_back_with_notice() {
    let (store, mut board) = loaded_board(seeded()).await;
    store.fail("update_opportunity_stage");

    let stage_move = board.begin_move("opp-1", "Ganho").unwrap().unwrap();
    assert_eq!(board.find_opportunity("opp-1").unwrap().stage, "Ganho");

    let result = stage_move.commit(board.store(), board.tenant()).await;
    let outcome = board.complete_move(stage_move, result);

    assert!(matches!(outcome, MoveOutcome::RolledBack(DealDeskError::Persistence(_))));
    assert_eq!(board.find_opportunity("opp-1").unwrap().stage, "Novo");
    assert_eq!(store.opportunity("opp-1").unwrap().stage, "Novo");

    let notices = board.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn drop_on_current_stage_is_a_no_op() {
    let (store, mut board) = loaded_board(seeded()).await;

    let outcome = board.move_opportunity("opp-2", "GANHO").await.unwrap();

    assert_eq!(outcome, MoveOutcome::Unchanged);
    assert_eq!(store.call_count("update_opportunity_stage"), 0);
}

#[tokio::test]
async fn drop_on_unknown_stage_is_rejected() {
    let (_store, mut board) = loaded_board(seeded()).await;

    let err = board.move_opportunity("opp-1", "Arquivado").await.unwrap_err();

    assert!(matches!(err, DealDeskError::InvalidInput(_)));
    assert_eq!(board.find_opportunity("opp-1").unwrap().stage, "Novo");
}

#[tokio::test]
async fn second_drag_of_pending_card_is_rejected() {
    let (store, mut board) = loaded_board(seeded()).await;

    let first = board.begin_move("opp-1", "Proposta").unwrap().unwrap();
    let second = board.begin_move("opp-1", "Perdido");
    assert!(matches!(second, Err(DealDeskError::Conflict(_))));

    let other_card = board.begin_move("opp-2", "Perdido").unwrap().unwrap();

    let result = first.commit(board.store(), board.tenant()).await;
    board.complete_move(first, result);
    let result = other_card.commit(board.store(), board.tenant()).await;
    board.complete_move(other_card, result);

    assert_eq!(store.opportunity("opp-1").unwrap().stage, "Proposta");
    assert_eq!(store.opportunity("opp-2").unwrap().stage, "Perdido");

    let outcome = board.move_opportunity("opp-1", "Perdido").await.unwrap();
    assert_eq!(outcome, MoveOutcome::Moved, "pending flag clears after completion");
}

#[tokio::test]
async fn empty_title_fails_validation_without_network_call() {
    let (store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());

    let err = board.save_draft().await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(store.call_count("save_opportunity_with_line_items"), 0);
    assert!(board.draft().is_some());
    assert!(board.drain_notices().is_empty(), "validation errors are shown inline");
}

#[tokio::test]
async fn create_draft_defaults_to_first_stage_and_saves_line_items() {
    let (store, mut board) = loaded_board(seeded()).await;
    let draft = board.open_for_create(today());
    assert_eq!(draft.fields().stage, "Novo");
    assert_eq!(draft.fields().close_date, Some(today()));

    let draft = board.draft_mut().unwrap();
    draft.set_field("title", "Renovação anual").unwrap();
    draft.set_field("customer", "cus-7").unwrap();
    draft.add_line_item(Some("prod-a"), Some(2), Some(dec("150")));
    draft.add_line_item(Some("prod-b"), None, Some(dec("20")));

    let saved = board.save_draft().await.unwrap();

    assert_eq!(saved.value, dec("320"));
    assert!(board.draft().is_none(), "modal closes after success");
    assert_eq!(board.find_opportunity(&saved.id).unwrap().title, "Renovação anual");

    let persisted = store.persisted_line_items(&saved.id);
    assert_eq!(persisted.len(), 2);
    assert!(persisted.iter().all(|item| !item.id.is_temporary()));
    assert_eq!(store.opportunity(&saved.id).unwrap().value, dec("320"));
    assert_ne!(saved.id, "opp-1");
    assert_eq!(store.opportunity("opp-1").unwrap().value, dec("1000"), "seeded card untouched");

    let notices = board.drain_notices();
    assert_eq!(notices.last().unwrap().level, NoticeLevel::Success);
}

#[tokio::test]
async fn manual_value_edit_cannot_diverge_from_saved_line_items() {
    let (store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());
    let draft = board.draft_mut().unwrap();
    draft.set_title("Licenças");
    draft.add_line_item(Some("prod-a"), Some(2), Some(dec("10")));
    draft.set_field("value", "5").unwrap();

    let saved = board.save_draft().await.unwrap();

    let items_total: rust_decimal::Decimal =
        store.persisted_line_items(&saved.id).iter().map(LineItem::line_total).sum();
    assert_eq!(items_total, dec("20"));
    assert_eq!(store.opportunity(&saved.id).unwrap().value, items_total);
    assert_eq!(saved.value, items_total);
}

#[tokio::test]
async fn failed_save_keeps_draft_open() {
    let (store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());
    board.draft_mut().unwrap().set_title("Deal");
    store.fail("save_opportunity_with_line_items");

    let err = board.save_draft().await.unwrap_err();

    assert!(matches!(err, DealDeskError::Persistence(_)));
    assert_eq!(board.draft().unwrap().fields().title, "Deal");
    assert_eq!(board.opportunities().len(), 3);
    assert_eq!(board.drain_notices()[0].level, NoticeLevel::Error);

    store.recover("save_opportunity_with_line_items");
    assert!(board.save_draft().await.is_ok(), "save lock released after failure");
}

#[tokio::test]
async fn double_submitted_save_is_rejected_without_network_call() {
    let (store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());
    board.draft_mut().unwrap().set_title("Deal");

    let first = board.begin_save().unwrap();
    let second = board.begin_save();
    assert!(matches!(second, Err(DealDeskError::Conflict(_))));

    let result = first.execute(board.store(), board.tenant()).await;
    board.complete_save(first, result).unwrap();

    assert_eq!(store.call_count("save_opportunity_with_line_items"), 1);
    assert_eq!(board.opportunities().len(), 4);
}

#[tokio::test]
async fn edit_loads_line_items_and_replaces_them_on_save() {
    let items = vec![LineItem {
        id: LineItemId::persisted("li-1"),
        opportunity_id: Some("opp-1".into()),
        product_id: "prod-a".into(),
        product_name: Some("Plano Pro".into()),
        quantity: 4,
        unit_price: dec("250"),
    }];
    let (store, mut board) = loaded_board(seeded().with_line_items("opp-1", items)).await;

    let draft = board.open_for_edit_and_load("opp-1").await.unwrap();
    assert_eq!(draft.line_items_state(), LineItemsState::Ready);
    assert_eq!(draft.value(), dec("1000"));

    let draft = board.draft_mut().unwrap();
    let id = draft.ledger().items()[0].id.clone();
    let request = draft.request_line_item_removal(&id).unwrap();
    draft.confirm_line_item_removal(request);
    draft.add_line_item(Some("prod-b"), Some(1), Some(dec("80")));

    let saved = board.save_draft().await.unwrap();

    assert_eq!(saved.id, "opp-1");
    assert_eq!(saved.value, dec("80"));
    let persisted = store.persisted_line_items("opp-1");
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].product_id, "prod-b");
}

#[tokio::test]
async fn stale_line_item_load_is_discarded() {
    let (_store, mut board) = loaded_board(seeded()).await;

    let stale = board.open_for_edit("opp-1").unwrap();
    let current = board.open_for_edit("opp-2").unwrap();

    let applied = board.complete_line_item_load(
        stale,
        Ok(vec![LineItem {
            id: LineItemId::persisted("li-9"),
            opportunity_id: Some("opp-1".into()),
            product_id: "prod-z".into(),
            product_name: None,
            quantity: 1,
            unit_price: dec("9999"),
        }]),
    );
    assert!(!applied);
    assert_eq!(board.draft().unwrap().opportunity_id(), Some("opp-2"));
    assert_eq!(board.draft().unwrap().line_items_state(), LineItemsState::Loading);
    assert_eq!(board.draft().unwrap().value(), dec("250.50"));

    assert!(board.complete_line_item_load(current, Ok(Vec::new())));
    assert_eq!(board.draft().unwrap().line_items_state(), LineItemsState::Ready);
}

#[tokio::test]
async fn save_is_blocked_while_line_items_load_or_after_failure() {
    let (store, mut board) = loaded_board(seeded()).await;

    let load = board.open_for_edit("opp-1").unwrap();
    assert!(matches!(board.begin_save(), Err(DealDeskError::Conflict(_))));

    board.complete_line_item_load(load, Err(DealDeskError::Network("timeout".into())));
    assert_eq!(board.draft().unwrap().line_items_state(), LineItemsState::Failed);
    assert!(matches!(board.save_draft().await, Err(DealDeskError::Conflict(_))));
    assert_eq!(store.call_count("save_opportunity_with_line_items"), 0);
}

#[tokio::test]
async fn add_product_line_prices_from_catalog() {
    let store = seeded().with_products(vec![product("prod-pro", "Plano Pro", "249.90")]);
    let (_store, mut board) = loaded_board(store).await;
    board.open_for_create(today());

    board.add_product_line("prod-pro", Some(2)).await.unwrap();
    let missing = board.add_product_line("prod-missing", Some(1)).await;

    let draft = board.draft().unwrap();
    assert_eq!(draft.value(), dec("499.80"));
    assert_eq!(draft.ledger().len(), 1);
    assert!(matches!(missing, Err(DealDeskError::NotFound(_))));
}

#[tokio::test]
async fn deleting_stage_orphans_its_opportunities() {
    let (store, mut board) = loaded_board(seeded()).await;

    board.delete_stage("st-3").await.unwrap();

    assert_eq!(store.opportunity("opp-2").unwrap().stage, "Ganho");
    assert_eq!(board.find_opportunity("opp-3").unwrap().stage, "ganho");
    assert_eq!(board.opportunities().len(), 3);

    let view = board.board_view();
    assert_eq!(view.columns.len(), 3);
    assert_eq!(view.orphaned.len(), 2);

    let warnings = board.integrity_warnings();
    assert!(warnings.contains(&IntegrityWarning::StageOrphanedOpportunities {
        stage: "Ganho".into(),
        opportunity_ids: vec!["opp-2".into(), "opp-3".into()],
    }));
    assert!(warnings.contains(&IntegrityWarning::OrphanedOpportunity {
        opportunity_id: "opp-2".into(),
        stage: "Ganho".into(),
    }));
    assert_eq!(board.drain_notices()[0].level, NoticeLevel::Warning);
}

#[tokio::test]
async fn renaming_stage_orphans_cards_on_old_name() {
    let (_store, mut board) = loaded_board(seeded()).await;

    let renamed = board.update_stage("st-1", "Entrada", "blue").await.unwrap();

    assert_eq!(renamed.name, "Entrada");
    assert_eq!(renamed.position, 1);
    assert!(board.by_stage("Entrada").is_empty());
    assert_eq!(board.board_view().orphaned[0].id, "opp-1");
}

#[tokio::test]
async fn recolor_only_does_not_warn() {
    let (_store, mut board) = loaded_board(seeded()).await;

    board.update_stage("st-1", "novo", "green").await.unwrap();

    assert!(board.integrity_warnings().is_empty());
    assert_eq!(board.by_stage("Novo").len(), 1);
}

#[tokio::test]
async fn delete_opportunity_removes_card_and_open_draft() {
    let (store, mut board) = loaded_board(seeded()).await;
    let _load = board.open_for_edit("opp-2").unwrap();

    board.delete_draft().await.unwrap();

    assert!(board.find_opportunity("opp-2").is_none());
    assert!(store.opportunity("opp-2").is_none());
    assert!(board.draft().is_none());
}

#[tokio::test]
async fn delete_requires_a_saved_opportunity() {
    let (store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());

    let err = board.delete_draft().await.unwrap_err();

    assert!(matches!(err, DealDeskError::InvalidInput(_)));
    assert_eq!(store.call_count("delete_opportunity"), 0);
}

#[tokio::test]
async fn board_reads_stay_available_while_a_delete_is_in_flight() {
    let (store, mut board) = loaded_board(seeded()).await;

    let request = board.begin_delete("opp-1").unwrap();
    assert_eq!(board.board_view().columns.len(), 4);
    assert!(board.find_opportunity("opp-1").is_some());

    let result = request.execute(&*store, &tenant()).await;
    board.complete_delete(request, result).unwrap();

    assert!(board.find_opportunity("opp-1").is_none());
    assert!(store.opportunity("opp-1").is_none());
}

#[tokio::test]
async fn failed_delete_keeps_card_and_raises_notice() {
    let store = seeded();
    store.fail("delete_opportunity");
    let (store, mut board) = loaded_board(store).await;

    let request = board.begin_delete("opp-2").unwrap();
    let result = request.execute(&*store, &tenant()).await;
    let err = board.complete_delete(request, result).unwrap_err();

    assert!(matches!(err, DealDeskError::Persistence(_)));
    assert!(board.find_opportunity("opp-2").is_some());
    assert_eq!(board.drain_notices()[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn stage_edit_reaches_registry_only_after_commit() {
    let (store, mut board) = loaded_board(seeded()).await;

    let edit = board.begin_add_stage("Negociação", "orange");
    assert_eq!(board.stages().len(), 4);

    let result = edit.commit(&*store, &tenant()).await;
    let created = board.complete_stage_edit(edit, result).unwrap().unwrap();

    assert_eq!(created.position, 5);
    assert_eq!(board.stages().last().unwrap().name, "Negociação");
}

#[tokio::test]
async fn failed_reorder_is_recovered_by_stage_reload() {
    let store = seeded();
    store.fail_reorder_of("st-4");
    let (store, mut board) = loaded_board(store).await;

    let mut ordered = board.stages().to_vec();
    ordered.reverse();
    let edit = board.begin_reorder_stages(ordered);
    let result = edit.commit(&*store, &tenant()).await;
    assert!(board.complete_stage_edit(edit, result).is_err());

    board.complete_stage_load(store.list_stages(&tenant()).await);

    let mut persisted: Vec<(String, u32)> = store.stages().into_iter().map(|s| (s.id, s.position)).collect();
    let mut cached: Vec<(String, u32)> = board.stages().iter().map(|s| (s.id.clone(), s.position)).collect();
    persisted.sort();
    cached.sort();
    assert_eq!(cached, persisted);
    assert!(cached.contains(&("st-1".to_string(), 4)));
}

#[tokio::test]
async fn product_arriving_after_draft_switch_is_rejected() {
    let store = seeded().with_products(vec![product("prod-pro", "Plano Pro", "249.90")]);
    let (store, mut board) = loaded_board(store).await;
    board.open_for_create(today());

    let lookup = board.begin_product_line("prod-pro", Some(1)).unwrap();
    let result = lookup.fetch(&*store, &tenant()).await;
    board.open_for_create(today());

    let err = board.complete_product_line(lookup, result).unwrap_err();
    assert!(matches!(err, DealDeskError::Conflict(_)));
    assert!(board.draft().unwrap().ledger().is_empty());
}

#[tokio::test]
async fn line_item_removal_waits_for_confirmation() {
    let (_store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());
    let draft = board.draft_mut().unwrap();
    let keep = draft.add_line_item(Some("prod-a"), Some(1), Some(dec("10"))).unwrap();
    let removing = draft.add_line_item(Some("prod-b"), Some(2), Some(dec("5"))).unwrap();

    let pending = board.request_line_item_removal(removing.as_str()).unwrap();
    assert_eq!(pending.id, removing);
    assert_eq!(board.draft().unwrap().ledger().len(), 2);

    let wrong = board.confirm_line_item_removal(keep.as_str());
    assert!(matches!(wrong, Err(DealDeskError::Conflict(_))));

    let removed = board.confirm_line_item_removal(removing.as_str()).unwrap();
    assert_eq!(removed.id, removing);
    assert_eq!(board.draft().unwrap().value(), dec("10"));

    let repeated = board.confirm_line_item_removal(removing.as_str());
    assert!(matches!(repeated, Err(DealDeskError::InvalidInput(_))));
}

#[tokio::test]
async fn pending_removal_does_not_survive_a_new_draft() {
    let (_store, mut board) = loaded_board(seeded()).await;
    board.open_for_create(today());
    let id = board.draft_mut().unwrap().add_line_item(Some("prod-a"), Some(1), Some(dec("10"))).unwrap();
    board.request_line_item_removal(id.as_str()).unwrap();

    board.open_for_create(today());

    assert!(matches!(board.confirm_line_item_removal(id.as_str()), Err(DealDeskError::Conflict(_))));
}
