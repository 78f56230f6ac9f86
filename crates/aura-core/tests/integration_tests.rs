//! Integration tests for aura-core
//!
//! These tests exercise the full capture → export → import → report workflow.

use aura_core::{
    archive::{read_backup_file, write_backup_file},
    models::VOICE_SOURCE,
    Analytics, CaptureTime, ChildRecord, Classifier, Database, DateRange, Expense, Intent,
    KeywordClassifier, ReferencePolicy, Vault, VoiceEntry,
};
use chrono::NaiveDate;
use serde_json::Map;

fn may(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

fn at(day: u32) -> CaptureTime {
    let local = may(day)
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_local_timezone(chrono::Local)
        .earliest()
        .unwrap();
    CaptureTime {
        today: may(day),
        now_ms: local.timestamp_millis(),
    }
}

/// Utterances a user might capture over a few days
fn transcripts() -> Vec<(&'static str, u32)> {
    vec![
        ("spent 250 rupees on lunch", 1),
        ("bought new shoes for 1,800 rs", 2),
        ("I feel stressed about work", 2),
        ("remind me to pay rent", 3),
        ("need to renew the passport", 3),
        ("the spare key is under the mat", 4),
    ]
}

// =============================================================================
// Store Scenario
// =============================================================================

#[test]
fn test_save_load_purge_scenario() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    let entry = VoiceEntry {
        id: "a1".to_string(),
        raw_text: "spent 250 on food".to_string(),
        intent: Intent::Expense,
        confidence: 0.95,
        extracted_entities: Map::new(),
        created_at: 1_714_550_400_000,
        source: VOICE_SOURCE.to_string(),
    };
    let expense = Expense {
        id: "x1".to_string(),
        entry_id: "a1".to_string(),
        amount: 250.0,
        currency: "INR".to_string(),
        category: "Food".to_string(),
        date: "2024-05-01".to_string(),
        description: "food".to_string(),
    };

    db.save_item(&entry).expect("save entry");
    db.save_item(&expense).expect("save expense");

    let loaded = db.load_all().expect("load");
    assert_eq!(loaded.voice_entries, vec![entry]);
    assert_eq!(loaded.expenses, vec![expense]);

    db.clear_all().expect("purge");
    let loaded = db.load_all().expect("load after purge");
    assert!(loaded.expenses.is_empty());
    assert!(loaded.voice_entries.is_empty());
    assert_eq!(
        loaded.categories,
        vec![
            "Food",
            "Groceries",
            "Transport",
            "Shopping",
            "Bills",
            "Entertainment",
            "Medical",
            "Others"
        ]
    );
}

// =============================================================================
// Capture Workflow
// =============================================================================

#[tokio::test]
async fn test_classify_capture_and_report() {
    let vault = Vault::from_database(Database::in_memory().unwrap());
    let classifier = KeywordClassifier::new();

    for (text, day) in transcripts() {
        let classification = classifier.classify(text).await.unwrap();
        vault.capture_at(text, &classification, at(day)).await.unwrap();
    }

    let snapshot = vault.snapshot().await.unwrap();
    assert_eq!(snapshot.voice_entries.len(), 6);
    assert_eq!(snapshot.expenses.len(), 2);
    assert_eq!(snapshot.tasks.len(), 2);
    assert_eq!(snapshot.moods.len(), 1);
    assert_eq!(snapshot.notes.len(), 1);
    assert!(snapshot.dangling_references().is_empty());

    let shoes = snapshot
        .expenses
        .iter()
        .find(|e| e.amount == 1800.0)
        .expect("shoe expense");
    assert_eq!(shoes.category, "Shopping");
    assert_eq!(shoes.date, "2024-05-02");

    let range = DateRange::new(may(1), may(2)).unwrap();
    let report = vault.analytics(range).await.unwrap();
    assert_eq!(report.total_spend, 2050.0);
    assert_eq!(report.mood_counts.get("Neutral"), Some(&1));
    assert_eq!(report.entries_by_intent.get(&Intent::Expense), Some(&2));
    assert_eq!(report.tasks.total, 0);

    let later = vault
        .analytics(DateRange::single_day(may(3)))
        .await
        .unwrap();
    assert_eq!(later.total_spend, 0.0);
    assert_eq!(later.tasks.total, 1);
    assert_eq!(later.tasks.reminders_pending, 1);
    assert_eq!(later.tasks.efficiency, 0);
}

// =============================================================================
// Backup Round Trip
// =============================================================================

#[tokio::test]
async fn test_export_file_import_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let classifier = KeywordClassifier::new();

    let source = Vault::from_database(Database::in_memory().unwrap());
    for (text, day) in transcripts() {
        let classification = classifier.classify(text).await.unwrap();
        source.capture_at(text, &classification, at(day)).await.unwrap();
    }

    let path = dir.path().join("aura_vault_2024-05-04.json.gz");
    let json = source.export_backup_json().await.unwrap();
    write_backup_file(&path, &json).unwrap();

    let target = Vault::from_database(Database::in_memory().unwrap());
    let restored = read_backup_file(&path).unwrap();
    let stats = target
        .import_backup_json(restored.clone(), ReferencePolicy::Strict)
        .await
        .unwrap();
    assert_eq!(stats.total_records(), 12);
    assert_eq!(stats.unresolved_references, 0);

    // Same content up to id relabelling
    let before = source.snapshot().await.unwrap();
    let after = target.snapshot().await.unwrap();
    let texts = |s: &aura_core::Snapshot| {
        let mut t: Vec<String> = s.voice_entries.iter().map(|e| e.raw_text.clone()).collect();
        t.sort();
        t
    };
    assert_eq!(texts(&before), texts(&after));
    for expense in &after.expenses {
        let parent = after
            .voice_entries
            .iter()
            .find(|e| e.id == expense.entry_id)
            .expect("expense parent");
        let original = before
            .expenses
            .iter()
            .find(|e| e.amount == expense.amount)
            .expect("original expense");
        let original_parent = before
            .voice_entries
            .iter()
            .find(|e| e.id == original.entry_id)
            .unwrap();
        assert_eq!(parent.raw_text, original_parent.raw_text);
        assert_ne!(expense.id, original.id);
    }

    // A second import duplicates rather than merges
    target
        .import_backup_json(restored, ReferencePolicy::Lenient)
        .await
        .unwrap();
    let doubled = target.snapshot().await.unwrap();
    assert_eq!(doubled.total_records(), 24);

    let range = DateRange::new(may(1), may(31)).unwrap();
    assert_eq!(
        Analytics::compute(&doubled, &range).total_spend,
        2.0 * Analytics::compute(&before, &range).total_spend
    );
}

#[test]
fn test_lenient_import_of_orphaned_children() {
    let db = Database::in_memory().unwrap();
    let json = r#"{
        "voiceEntries": [],
        "expenses": [{
            "id": "x1", "entryId": "lost", "amount": 99, "currency": "INR",
            "category": "Bills", "date": "2024-05-01", "description": "water"
        }],
        "tasks": null
    }"#;

    let stats = db.import_backup_json(json, ReferencePolicy::Lenient).unwrap();
    assert_eq!(stats.expenses, 1);
    assert_eq!(stats.unresolved_references, 1);

    let loaded = db.load_all().unwrap();
    assert!(loaded.expenses[0].entry_id.starts_with("unresolved-"));

    let strict = Database::in_memory().unwrap();
    assert!(strict
        .import_backup_json(json, ReferencePolicy::Strict)
        .is_err());
    assert_eq!(strict.load_all().unwrap().total_records(), 0);
}

#[test]
fn test_child_record_serializes_with_kind() {
    let child = ChildRecord::Expense(Expense {
        id: "x1".to_string(),
        entry_id: "a1".to_string(),
        amount: 10.0,
        currency: "INR".to_string(),
        category: "Food".to_string(),
        date: "2024-05-01".to_string(),
        description: "tea".to_string(),
    });
    let json = serde_json::to_value(&child).unwrap();
    assert_eq!(json["kind"], "expense");
    assert_eq!(json["entryId"], "a1");
}
