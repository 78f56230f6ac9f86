//! Session over the entity store
//!
//! A [`Vault`] owns the opened [`Database`] and an in-memory [`Snapshot`]
//! mirroring it. Callers read the snapshot; every mutation goes to disk
//! first and the snapshot is only touched after the commit returns, so the
//! view is never ahead of disk. Writers are serialized on the view lock.
//!
//! SQLite calls block, so they run on the tokio blocking pool.

use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

use crate::analytics::{Analytics, DateRange};
use crate::capture::{derive, CaptureTime, Derivation};
use crate::classify::Classification;
use crate::db::{Database, StoredRecord, TableCounts};
use crate::error::{Error, Result};
use crate::export::{ImportStats, ReferencePolicy};
use crate::models::{ChildRecord, Snapshot, Task};
use crate::vocabulary::{default_categories, CategoryVocabulary};

type Opener = Arc<dyn Fn() -> Result<Database> + Send + Sync>;

/// Run blocking store work off the async threads
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

pub struct Vault {
    opener: Opener,
    db: OnceCell<Database>,
    view: RwLock<Snapshot>,
}

impl Vault {
    /// Session over the database at `path`, opened lazily on first use
    pub fn new(path: impl Into<String>, passphrase: Option<String>) -> Self {
        let path = path.into();
        Self::with_opener(move || Database::new_with_key(&path, passphrase.as_deref()))
    }

    pub fn with_opener<F>(opener: F) -> Self
    where
        F: Fn() -> Result<Database> + Send + Sync + 'static,
    {
        Self {
            opener: Arc::new(opener),
            db: OnceCell::new(),
            view: RwLock::new(Snapshot::default()),
        }
    }

    /// Session over an already opened database
    pub fn from_database(db: Database) -> Self {
        Self::with_opener(move || Ok(db.clone()))
    }

    /// Open the store and load the view.
    ///
    /// Idempotent. Concurrent callers share one in-flight initialization.
    pub async fn init(&self) -> Result<&Database> {
        self.db
            .get_or_try_init(|| async {
                let opener = Arc::clone(&self.opener);
                let db = blocking(move || opener()).await?;

                let loader = db.clone();
                let snapshot = blocking(move || loader.load_all()).await?;
                info!(records = snapshot.total_records(), "Vault opened");

                *self.view.write().await = snapshot;
                Ok(db)
            })
            .await
    }

    pub async fn database(&self) -> Result<Database> {
        Ok(self.init().await?.clone())
    }

    /// Copy of the current view
    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.init().await?;
        Ok(self.view.read().await.clone())
    }

    /// Derive and commit a capture at the current time
    pub async fn capture(&self, raw_text: &str, classification: &Classification) -> Result<Derivation> {
        self.capture_at(raw_text, classification, CaptureTime::now())
            .await
    }

    pub async fn capture_at(
        &self,
        raw_text: &str,
        classification: &Classification,
        at: CaptureTime,
    ) -> Result<Derivation> {
        let db = self.database().await?;
        let mut view = self.view.write().await;

        // Staged: only replaces the view's categories after the commit
        let mut vocabulary = CategoryVocabulary::from_names(&view.categories);
        let derivation = derive(raw_text, classification, &mut vocabulary, at);

        let staged = derivation.clone();
        blocking(move || {
            db.commit_capture(&staged.entry, &staged.child, staged.new_category.as_deref())
        })
        .await
        .inspect_err(|e| warn!(error = %e, "Capture not committed"))?;

        derivation.entry.upsert_into(&mut view);
        match &derivation.child {
            ChildRecord::Expense(e) => e.upsert_into(&mut view),
            ChildRecord::Task(t) => t.upsert_into(&mut view),
            ChildRecord::Mood(m) => m.upsert_into(&mut view),
            ChildRecord::Note(n) => n.upsert_into(&mut view),
        }
        view.categories = vocabulary.into_names();

        Ok(derivation)
    }

    /// Upsert one record, then mirror it into the view
    pub async fn save_item<R: StoredRecord>(&self, item: R) -> Result<()> {
        let db = self.database().await?;
        let mut view = self.view.write().await;

        let record = item.clone();
        blocking(move || db.save_item(&record)).await?;

        item.upsert_into(&mut view);
        Ok(())
    }

    pub async fn toggle_task(&self, id: &str) -> Result<Task> {
        let db = self.database().await?;
        let mut view = self.view.write().await;

        let id = id.to_string();
        let task = blocking(move || db.toggle_task(&id)).await?;

        task.upsert_into(&mut view);
        Ok(task)
    }

    pub async fn add_category(&self, name: &str) -> Result<bool> {
        let db = self.database().await?;
        let mut view = self.view.write().await;

        let name = name.to_string();
        let (added, categories) = blocking(move || {
            let added = db.add_category(&name)?;
            Ok((added, db.list_categories()?))
        })
        .await?;

        view.categories = categories;
        Ok(added)
    }

    /// Empty every table. Categories fall back to the defaults.
    pub async fn purge_all(&self) -> Result<()> {
        let db = self.database().await?;
        let mut view = self.view.write().await;

        blocking(move || db.clear_all()).await?;

        *view = Snapshot {
            categories: default_categories(),
            ..Default::default()
        };
        Ok(())
    }

    pub async fn import_backup_json(
        &self,
        json: String,
        policy: ReferencePolicy,
    ) -> Result<ImportStats> {
        let db = self.database().await?;
        let mut view = self.view.write().await;

        let (stats, snapshot) = blocking(move || {
            let stats = db.import_backup_json(&json, policy)?;
            Ok((stats, db.load_all()?))
        })
        .await?;

        *view = snapshot;
        Ok(stats)
    }

    pub async fn export_backup_json(&self) -> Result<String> {
        let db = self.database().await?;
        blocking(move || db.export_backup_json()).await
    }

    pub async fn counts(&self) -> Result<TableCounts> {
        let db = self.database().await?;
        blocking(move || db.counts()).await
    }

    /// Analytics over the current view
    pub async fn analytics(&self, range: DateRange) -> Result<Analytics> {
        self.init().await?;
        let view = self.view.read().await;
        Ok(Analytics::compute(&view, &range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use serde_json::json;

    use crate::models::{Expense, Intent, MoodRecord, Table};

    fn at() -> CaptureTime {
        CaptureTime {
            today: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            now_ms: 1_714_550_400_000,
        }
    }

    fn expense_classification(entities: serde_json::Value) -> Classification {
        Classification::new(Intent::Expense).with_entities(entities.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_init_opens_once() {
        let db = Database::in_memory().unwrap();
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);

        let vault = Vault::with_opener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(db.clone())
        });

        let (a, b, c) = tokio::join!(vault.init(), vault.init(), vault.snapshot());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_init_failure_is_reported() {
        let vault = Vault::with_opener(|| Err(Error::StorageInit("blocked".into())));
        assert!(matches!(vault.init().await, Err(Error::StorageInit(_))));
    }

    #[tokio::test]
    async fn test_capture_updates_view_and_disk() {
        let db = Database::in_memory().unwrap();
        let vault = Vault::from_database(db.clone());

        let derivation = vault
            .capture_at(
                "spent 250 on cat food",
                &expense_classification(json!({ "amount": 250, "category": "Pets" })),
                at(),
            )
            .await
            .unwrap();
        assert_eq!(derivation.new_category.as_deref(), Some("Pets"));

        let view = vault.snapshot().await.unwrap();
        let disk = db.load_all().unwrap();
        assert_eq!(view, disk);
        assert_eq!(view.expenses[0].entry_id, view.voice_entries[0].id);
        assert_eq!(view.categories.len(), 9);
    }

    #[tokio::test]
    async fn test_failed_capture_leaves_view_and_disk_unchanged() {
        let db = Database::in_memory().unwrap();
        let vault = Vault::from_database(db.clone());
        let before = vault.snapshot().await.unwrap();

        db.conn().unwrap().execute_batch("DROP TABLE expenses;").unwrap();

        let err = vault
            .capture_at(
                "spent 40 on tea",
                &expense_classification(json!({ "amount": 40, "category": "Drinks" })),
                at(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::StorageWrite {
                table: Table::Expenses,
                ..
            }
        ));

        assert_eq!(vault.snapshot().await.unwrap(), before);

        let conn = db.conn().unwrap();
        let entries: i64 = conn
            .query_row("SELECT COUNT(*) FROM voice_entries", [], |row| row.get(0))
            .unwrap();
        let categories: i64 = conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entries, 0);
        assert_eq!(categories, 0);
    }

    fn mood(id: &str, entry_id: &str, created_at: i64) -> MoodRecord {
        MoodRecord {
            id: id.to_string(),
            entry_id: entry_id.to_string(),
            sentiment: "Calm".to_string(),
            sentence: "Mood reflection".to_string(),
            reason: "long walk".to_string(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_save_item_mirrors_into_view() {
        let db = Database::in_memory().unwrap();
        let vault = Vault::from_database(db.clone());

        let derivation = vault
            .capture_at(
                "spent 250 on lunch",
                &expense_classification(json!({ "amount": 250 })),
                at(),
            )
            .await
            .unwrap();
        let parent = derivation.entry.id.clone();

        // Older than the capture, so it must land behind it
        vault.save_item(mood("m-old", &parent, 1)).await.unwrap();
        vault
            .save_item(mood("m-new", &parent, at().now_ms + 1))
            .await
            .unwrap();

        let mut renamed = mood("m-old", &parent, 1);
        renamed.sentiment = "Tired".to_string();
        vault.save_item(renamed).await.unwrap();

        let view = vault.snapshot().await.unwrap();
        assert_eq!(view, db.load_all().unwrap());
        assert_eq!(view.moods.len(), 2);
        assert_eq!(view.moods[0].id, "m-new");
        assert_eq!(view.moods[1].sentiment, "Tired");
    }

    #[tokio::test]
    async fn test_failed_save_item_leaves_view_unchanged() {
        let db = Database::in_memory().unwrap();
        let vault = Vault::from_database(db.clone());
        vault.save_item(mood("m1", "a1", 10)).await.unwrap();
        let before = vault.snapshot().await.unwrap();

        db.conn().unwrap().execute_batch("DROP TABLE moods;").unwrap();

        let err = vault.save_item(mood("m2", "a1", 20)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::StorageWrite {
                table: Table::Moods,
                ..
            }
        ));
        assert_eq!(vault.snapshot().await.unwrap(), before);

        let err = vault
            .save_item(Expense {
                id: "x1".to_string(),
                entry_id: "a1".to_string(),
                amount: f64::INFINITY,
                currency: "INR".to_string(),
                category: "Food".to_string(),
                date: "2024-05-01".to_string(),
                description: "tea".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(vault.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_toggle_and_purge() {
        let vault = Vault::from_database(Database::in_memory().unwrap());

        let derivation = vault
            .capture_at("need to call the bank", &Classification::new(Intent::Todo), at())
            .await
            .unwrap();
        let ChildRecord::Task(task) = derivation.child else {
            panic!("expected task");
        };

        let toggled = vault.toggle_task(&task.id).await.unwrap();
        assert!(toggled.completed);
        assert!(vault.snapshot().await.unwrap().tasks[0].completed);

        vault.purge_all().await.unwrap();
        let view = vault.snapshot().await.unwrap();
        assert_eq!(view.total_records(), 0);
        assert_eq!(view.categories, default_categories());
    }

    #[tokio::test]
    async fn test_import_refreshes_view() {
        let source = Vault::from_database(Database::in_memory().unwrap());
        source
            .capture_at("feeling calm", &Classification::new(Intent::Mood), at())
            .await
            .unwrap();
        let json = source.export_backup_json().await.unwrap();

        let target = Vault::from_database(Database::in_memory().unwrap());
        let stats = target
            .import_backup_json(json, ReferencePolicy::Strict)
            .await
            .unwrap();
        assert_eq!(stats.voice_entries, 1);
        assert_eq!(stats.moods, 1);

        let view = target.snapshot().await.unwrap();
        assert_eq!(view.moods.len(), 1);
        assert_eq!(view.moods[0].entry_id, view.voice_entries[0].id);
    }

    #[tokio::test]
    async fn test_add_category_updates_view() {
        let vault = Vault::from_database(Database::in_memory().unwrap());
        assert!(vault.add_category("Travel").await.unwrap());
        assert!(!vault.add_category("travel").await.unwrap());

        let view = vault.snapshot().await.unwrap();
        assert_eq!(view.categories.len(), 9);
        assert_eq!(view.categories.last().map(String::as_str), Some("Travel"));
    }
}
