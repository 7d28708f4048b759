//! Implements ExpenseStore and GroupStore using a single JSON file.
//!
//! The whole ledger lives in memory behind an RwLock. Every mutation is applied to a
//! copy, written to disk, and only then published to readers, so a failed write
//! leaves the ledger exactly as it was. `in_memory()` skips the file entirely
//! (tests, throwaway sessions).

use crate::domain::{
    DomainError, Expense, ExpenseId, Group, GroupId, MemberId, NewExpense, PaymentStatus,
};
use crate::ports::{ExpenseStore, GroupStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::info;

/// On-disk shape: all groups, all expenses (insertion order).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerData {
    groups: Vec<Group>,
    expenses: Vec<Expense>,
}

/// JSON file-based ledger storage.
pub struct JsonStore {
    path: Option<PathBuf>,
    cache: RwLock<LedgerData>,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            cache: RwLock::new(LedgerData::default()),
        }
    }

    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cache: RwLock::new(LedgerData::default()),
        }
    }

    /// Load the ledger from disk. A missing file starts an empty ledger; a corrupt one is an error.
    pub async fn load(&self) -> Result<(), DomainError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = match fs::read_to_string(path).await {
            Ok(s) => serde_json::from_str(&s)
                .map_err(|e| DomainError::Store(format!("parse {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerData::default(),
            Err(e) => return Err(DomainError::Store(format!("read {}: {}", path.display(), e))),
        };
        info!(
            path = %path.display(),
            groups = data.groups.len(),
            expenses = data.expenses.len(),
            "ledger loaded"
        );
        *self.cache.write().await = data;
        Ok(())
    }

    /// Runs `change` on a copy of the ledger, saves it, then swaps it in.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut LedgerData) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut data = self.cache.write().await;
        let mut next = data.clone();
        let out = change(&mut next)?;
        self.save(&next).await?;
        *data = next;
        Ok(out)
    }

    /// Atomic save: write temp file, sync, rename over the target.
    async fn save(&self, data: &LedgerData) -> Result<(), DomainError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json =
            serde_json::to_string_pretty(data).map_err(|e| DomainError::Store(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Store(format!("create data dir: {}", e)))?;
        }
        let temp_path = path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::Store(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::Store(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::Store(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| DomainError::Store(format!("atomic rename failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ExpenseStore for JsonStore {
    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, DomainError> {
        let created = expense.into_expense(ExpenseId::new(), Utc::now());
        self.commit(|data| {
            data.expenses.push(created.clone());
            Ok(())
        })
        .await?;
        Ok(created)
    }

    async fn list_expenses(
        &self,
        group_id: GroupId,
        settled: bool,
    ) -> Result<Vec<Expense>, DomainError> {
        let data = self.cache.read().await;
        // Reverse insertion order first so equal timestamps still come out newest first.
        let mut out: Vec<Expense> = data
            .expenses
            .iter()
            .rev()
            .filter(|e| e.group_id == group_id && e.is_settled == settled)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_group_settled(&self, group_id: GroupId) -> Result<u64, DomainError> {
        let pending = {
            let data = self.cache.read().await;
            data.expenses
                .iter()
                .any(|e| e.group_id == group_id && !e.is_settled)
        };
        if !pending {
            return Ok(0);
        }
        self.commit(|data| {
            let mut changed = 0u64;
            for e in data
                .expenses
                .iter_mut()
                .filter(|e| e.group_id == group_id && !e.is_settled)
            {
                e.is_settled = true;
                changed += 1;
            }
            Ok(changed)
        })
        .await
    }
}

#[async_trait::async_trait]
impl GroupStore for JsonStore {
    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, DomainError> {
        let data = self.cache.read().await;
        Ok(data.groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.cache.read().await.groups.clone())
    }

    async fn create_group(&self, name: &str, members: &[MemberId]) -> Result<Group, DomainError> {
        let mut roster: Vec<MemberId> = Vec::with_capacity(members.len());
        for m in members {
            if !roster.contains(m) {
                roster.push(m.clone());
            }
        }
        let now = Utc::now();
        let group = Group {
            id: GroupId::new(),
            name: name.to_string(),
            members: roster,
            payment_status: PaymentStatus::pending(now),
            created_at: now,
        };

        self.commit(|data| {
            data.groups.push(group.clone());
            Ok(())
        })
        .await?;
        Ok(group)
    }

    async fn set_payment_status(
        &self,
        group_id: GroupId,
        status: PaymentStatus,
    ) -> Result<(), DomainError> {
        self.commit(|data| {
            let group = data
                .groups
                .iter_mut()
                .find(|g| g.id == group_id)
                .ok_or(DomainError::NotFound { group_id })?;
            group.payment_status = status;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cents, SplitLine, SplitType};

    fn lunch(group_id: GroupId, amount: i64) -> NewExpense {
        NewExpense {
            group_id,
            title: "Lunch".into(),
            amount: Cents::new(amount),
            paid_by: "alice".into(),
            split_type: SplitType::Unequal,
            split_details: vec![SplitLine::share("bob", Cents::new(amount))],
        }
    }

    #[tokio::test]
    async fn create_group_dedupes_roster() {
        let store = JsonStore::in_memory();
        let roster: Vec<MemberId> = ["a", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        let group = store.create_group("Flat", &roster).await.unwrap();

        assert_eq!(group.members, vec!["a", "b", "c"]);
        assert!(!group.payment_status.is_paid);
        assert_eq!(store.get_group(group.id).await.unwrap(), Some(group));
    }

    #[tokio::test]
    async fn listing_filters_by_group_and_status_newest_first() {
        let store = JsonStore::in_memory();
        let g1 = store.create_group("One", &[]).await.unwrap().id;
        let g2 = store.create_group("Two", &[]).await.unwrap().id;

        let first = store.create_expense(lunch(g1, 100)).await.unwrap();
        let second = store.create_expense(lunch(g1, 200)).await.unwrap();
        store.create_expense(lunch(g2, 300)).await.unwrap();

        let active = store.list_expenses(g1, false).await.unwrap();
        assert_eq!(
            active.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(store.list_expenses(g1, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_settled_only_touches_one_group() {
        let store = JsonStore::in_memory();
        let g1 = store.create_group("One", &[]).await.unwrap().id;
        let g2 = store.create_group("Two", &[]).await.unwrap().id;
        store.create_expense(lunch(g1, 100)).await.unwrap();
        store.create_expense(lunch(g1, 200)).await.unwrap();
        store.create_expense(lunch(g2, 300)).await.unwrap();

        assert_eq!(store.mark_group_settled(g1).await.unwrap(), 2);
        assert_eq!(store.mark_group_settled(g1).await.unwrap(), 0);
        assert_eq!(store.list_expenses(g1, true).await.unwrap().len(), 2);
        assert_eq!(store.list_expenses(g2, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn persists_and_reloads_from_disk() {
        let path = std::env::temp_dir().join(format!("split-ledger-{}.json", GroupId::new()));
        let store = JsonStore::new(&path);
        let group = store
            .create_group("Trip", &["alice".to_string()])
            .await
            .unwrap();
        store.create_expense(lunch(group.id, 4200)).await.unwrap();

        let reopened = JsonStore::new(&path);
        reopened.load().await.unwrap();
        assert_eq!(reopened.get_group(group.id).await.unwrap(), Some(group.clone()));
        assert_eq!(reopened.list_expenses(group.id, false).await.unwrap().len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_save_leaves_ledger_untouched() {
        let dir = std::env::temp_dir().join(format!("split-ledger-{}", GroupId::new()));
        let store = JsonStore::new(dir.join("ledger.json"));
        let group = store
            .create_group("Trip", &["alice".to_string(), "bob".to_string()])
            .await
            .unwrap();
        store.create_expense(lunch(group.id, 100)).await.unwrap();

        // Replace the data directory with a plain file so every save fails.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"not a directory").unwrap();

        let err = store.create_expense(lunch(group.id, 900)).await.unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
        let active = store.list_expenses(group.id, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].amount, Cents::new(100));

        assert!(store.mark_group_settled(group.id).await.is_err());
        assert_eq!(store.list_expenses(group.id, false).await.unwrap().len(), 1);
        assert!(store.list_expenses(group.id, true).await.unwrap().is_empty());

        let now = Utc::now();
        assert!(
            store
                .set_payment_status(group.id, PaymentStatus::settled(now))
                .await
                .is_err()
        );
        let reloaded = store.get_group(group.id).await.unwrap().unwrap();
        assert!(!reloaded.payment_status.is_paid);

        let _ = std::fs::remove_file(&dir);
    }
}
