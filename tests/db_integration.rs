//! Database integration tests.
//!
//! All tests require TEST_DATABASE_URL to be set.
//! Run with: TEST_DATABASE_URL=postgres://... cargo test --test db_integration
//!
//! Tests should be run single-threaded to avoid conflicts:
//!   cargo test --test db_integration -- --test-threads=1

mod common;

use undian::db::{AdmitDecision, Database, EntryFilter, MarkDecision};

/// Skip the test if TEST_DATABASE_URL is not set.
macro_rules! require_db {
    () => {
        if !common::has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

async fn setup() -> Database {
    common::setup_test_db().await
}

/// Admit an entry that the test expects to succeed.
async fn admit_ok(db: &Database, handle: &str, wallet: &str, number: i32) -> i64 {
    match db.admit_entry(handle, wallet, number).await.unwrap() {
        AdmitDecision::Admitted { id } => id,
        other => panic!("expected admission, got {:?}", other),
    }
}

// --- Admission ---

#[tokio::test]
async fn connect_to_test_db() {
    require_db!();
    let _db = setup().await;
    // If we get here without panic, connection succeeded
}

#[tokio::test]
async fn admit_entry_and_retrieve() {
    require_db!();
    let db = setup().await;

    let id = admit_ok(&db, "alice", "0xAAA", 7).await;
    assert!(id > 0);

    let entries = db
        .get_entries_filtered(10, 0, &EntryFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].handle, "alice");
    assert_eq!(entries[0].wallet, "0xAAA");
    assert_eq!(entries[0].number, 7);
    assert!(!entries[0].winner);
}

#[tokio::test]
async fn limit_rejects_entry_past_cap() {
    require_db!();
    let db = setup().await;
    // Seeded cap is 3.

    admit_ok(&db, "alice", "0xAAA", 1).await;
    admit_ok(&db, "alice", "0xAAA", 2).await;
    admit_ok(&db, "alice", "0xAAA", 3).await;

    let decision = db.admit_entry("alice", "0xAAA", 4).await.unwrap();
    assert_eq!(decision, AdmitDecision::LimitExceeded { max: 3 });

    // The rejected attempt wrote nothing.
    assert_eq!(db.count_entries_for_handle("alice").await.unwrap(), 3);

    // A different handle is unaffected by alice's saturation.
    admit_ok(&db, "bob", "0xBBB", 4).await;
}

#[tokio::test]
async fn zero_cap_denies_all() {
    require_db!();
    let db = setup().await;
    db.set_max_entries(0).await.unwrap();

    let decision = db.admit_entry("alice", "0xAAA", 1).await.unwrap();
    assert_eq!(decision, AdmitDecision::LimitExceeded { max: 0 });
}

#[tokio::test]
async fn missing_settings_row_denies_all() {
    require_db!();
    let db = setup().await;
    sqlx::query("DELETE FROM settings WHERE id = 1")
        .execute(db.pool())
        .await
        .unwrap();

    let decision = db.admit_entry("alice", "0xAAA", 1).await.unwrap();
    assert_eq!(decision, AdmitDecision::LimitExceeded { max: 0 });
}

#[tokio::test]
async fn number_taken_across_handles() {
    require_db!();
    let db = setup().await;

    admit_ok(&db, "alice", "0xAAA", 42).await;

    let decision = db.admit_entry("bob", "0xBBB", 42).await.unwrap();
    assert_eq!(decision, AdmitDecision::NumberTaken);

    // The rejection consumed none of bob's quota.
    assert_eq!(db.count_entries_for_handle("bob").await.unwrap(), 0);
    assert!(db.is_number_taken(42).await.unwrap());
    assert!(!db.is_number_taken(43).await.unwrap());
}

#[tokio::test]
async fn concurrent_claims_on_same_number_admit_exactly_one() {
    require_db!();
    let db = setup().await;

    let (a, b) = tokio::join!(
        db.admit_entry("alice", "0xAAA", 50),
        db.admit_entry("bob", "0xBBB", 50),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    let admitted = [&a, &b]
        .iter()
        .filter(|d| matches!(d, AdmitDecision::Admitted { .. }))
        .count();
    assert_eq!(admitted, 1, "got {:?} and {:?}", a, b);
    assert!(
        matches!(a, AdmitDecision::NumberTaken) || matches!(b, AdmitDecision::NumberTaken)
    );
    assert_eq!(
        db.count_entries_filtered(&EntryFilter::default())
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn concurrent_submissions_respect_cap() {
    require_db!();
    let db = setup().await;
    db.set_max_entries(1).await.unwrap();

    let (a, b) = tokio::join!(
        db.admit_entry("alice", "0xAAA", 10),
        db.admit_entry("alice", "0xAAA", 11),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    let admitted = [&a, &b]
        .iter()
        .filter(|d| matches!(d, AdmitDecision::Admitted { .. }))
        .count();
    assert_eq!(admitted, 1, "got {:?} and {:?}", a, b);
    assert_eq!(db.count_entries_for_handle("alice").await.unwrap(), 1);
}

#[tokio::test]
async fn taken_numbers_lists_all_claimed() {
    require_db!();
    let db = setup().await;

    admit_ok(&db, "alice", "0xAAA", 9).await;
    admit_ok(&db, "alice", "0xAAA", 3).await;
    admit_ok(&db, "bob", "0xBBB", 27).await;

    let taken = db.taken_numbers().await.unwrap();
    assert_eq!(taken, vec![3, 9, 27]);
}

// --- Settings ---

#[tokio::test]
async fn cap_update_roundtrip() {
    require_db!();
    let db = setup().await;

    assert_eq!(db.get_max_entries().await.unwrap(), 3);
    db.set_max_entries(10).await.unwrap();
    assert_eq!(db.get_max_entries().await.unwrap(), 10);
}

// --- Filtering and search ---

#[tokio::test]
async fn filter_by_handle_substring() {
    require_db!();
    let db = setup().await;

    admit_ok(&db, "alice_wonder", "0xAAA", 1).await;
    admit_ok(&db, "bob", "0xBBB", 2).await;

    let filter = EntryFilter {
        handle: Some("wonder".to_string()),
        ..Default::default()
    };
    let entries = db.get_entries_filtered(10, 0, &filter).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].handle, "alice_wonder");
    assert_eq!(db.count_entries_filtered(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn filter_by_exact_number() {
    require_db!();
    let db = setup().await;

    admit_ok(&db, "alice", "0xAAA", 5).await;
    admit_ok(&db, "bob", "0xBBB", 55).await;

    let filter = EntryFilter {
        number: Some(55),
        ..Default::default()
    };
    let entries = db.get_entries_filtered(10, 0, &filter).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].handle, "bob");
}

#[tokio::test]
async fn sort_by_number_descending() {
    require_db!();
    let db = setup().await;

    admit_ok(&db, "alice", "0xAAA", 5).await;
    admit_ok(&db, "bob", "0xBBB", 90).await;
    admit_ok(&db, "carol", "0xCCC", 30).await;

    let filter = EntryFilter {
        sort_by: Some("number".to_string()),
        sort_dir: Some("desc".to_string()),
        ..Default::default()
    };
    let entries = db.get_entries_filtered(10, 0, &filter).await.unwrap();
    let numbers: Vec<i32> = entries.iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![90, 30, 5]);
}

#[tokio::test]
async fn pagination_with_offset() {
    require_db!();
    let db = setup().await;
    db.set_max_entries(10).await.unwrap();

    for n in 1..=5 {
        admit_ok(&db, "alice", "0xAAA", n).await;
    }

    let filter = EntryFilter {
        sort_by: Some("number".to_string()),
        sort_dir: Some("asc".to_string()),
        ..Default::default()
    };
    let page = db.get_entries_filtered(2, 2, &filter).await.unwrap();
    let numbers: Vec<i32> = page.iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![3, 4]);
    assert_eq!(db.count_entries_filtered(&filter).await.unwrap(), 5);
}

// --- Deletion ---

#[tokio::test]
async fn delete_entries_by_id_set() {
    require_db!();
    let db = setup().await;

    let a = admit_ok(&db, "alice", "0xAAA", 1).await;
    let b = admit_ok(&db, "bob", "0xBBB", 2).await;
    admit_ok(&db, "carol", "0xCCC", 3).await;

    let deleted = db.delete_entries(&[a, b]).await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = db
        .get_entries_filtered(10, 0, &EntryFilter::default())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].handle, "carol");
}

#[tokio::test]
async fn delete_unknown_ids_is_noop() {
    require_db!();
    let db = setup().await;

    admit_ok(&db, "alice", "0xAAA", 1).await;
    let deleted = db.delete_entries(&[999_999]).await.unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn deleted_number_becomes_claimable_again() {
    require_db!();
    let db = setup().await;

    let id = admit_ok(&db, "alice", "0xAAA", 42).await;
    db.delete_entries(&[id]).await.unwrap();

    admit_ok(&db, "bob", "0xBBB", 42).await;
}

// --- Winner marking ---

#[tokio::test]
async fn mark_and_unmark_winners() {
    require_db!();
    let db = setup().await;

    let a = admit_ok(&db, "alice", "0xAAA", 1).await;
    let b = admit_ok(&db, "bob", "0xBBB", 2).await;

    let decision = db.mark_winners(&[a, b], 1, Some(250.0)).await.unwrap();
    assert_eq!(decision, MarkDecision::Marked { updated: 2 });

    let winners = db.get_winners().await.unwrap();
    assert_eq!(winners.len(), 2);
    assert!(winners.iter().all(|w| w.rank == 1));
    assert!(winners.iter().all(|w| w.prize == Some(250.0)));

    // Clearing one leaves the other marked.
    let updated = db.unmark_winners(&[a]).await.unwrap();
    assert_eq!(updated, 1);

    let winners = db.get_winners().await.unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].number, 2);
}

#[tokio::test]
async fn rank_conflict_with_existing_winner() {
    require_db!();
    let db = setup().await;

    let a = admit_ok(&db, "alice", "0xAAA", 1).await;
    let b = admit_ok(&db, "bob", "0xBBB", 2).await;

    db.mark_winners(&[a], 1, None).await.unwrap();

    let decision = db.mark_winners(&[b], 1, None).await.unwrap();
    assert_eq!(decision, MarkDecision::RankConflict { rank: 1 });

    // The conflicting call changed nothing.
    let winners = db.get_winners().await.unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].number, 1);
}

#[tokio::test]
async fn remarking_same_set_is_not_a_conflict() {
    require_db!();
    let db = setup().await;

    let a = admit_ok(&db, "alice", "0xAAA", 1).await;

    db.mark_winners(&[a], 1, Some(100.0)).await.unwrap();

    // Re-marking the same id at the same rank updates the prize in place.
    let decision = db.mark_winners(&[a], 1, Some(500.0)).await.unwrap();
    assert_eq!(decision, MarkDecision::Marked { updated: 1 });

    let winners = db.get_winners().await.unwrap();
    assert_eq!(winners[0].prize, Some(500.0));
}

#[tokio::test]
async fn winners_ordered_by_rank_then_number() {
    require_db!();
    let db = setup().await;

    let a = admit_ok(&db, "alice", "0xAAA", 30).await;
    let b = admit_ok(&db, "bob", "0xBBB", 10).await;
    let c = admit_ok(&db, "carol", "0xCCC", 20).await;

    db.mark_winners(&[b], 2, None).await.unwrap();
    db.mark_winners(&[a, c], 1, None).await.unwrap();

    let winners = db.get_winners().await.unwrap();
    let order: Vec<(i32, i32)> = winners.iter().map(|w| (w.rank, w.number)).collect();
    assert_eq!(order, vec![(1, 20), (1, 30), (2, 10)]);
}

#[tokio::test]
async fn winners_only_filter() {
    require_db!();
    let db = setup().await;

    let a = admit_ok(&db, "alice", "0xAAA", 1).await;
    admit_ok(&db, "bob", "0xBBB", 2).await;
    db.mark_winners(&[a], 1, None).await.unwrap();

    let filter = EntryFilter {
        winners_only: Some(true),
        ..Default::default()
    };
    let entries = db.get_entries_filtered(10, 0, &filter).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].handle, "alice");
}
