//! SQLite-backed ledger via libsql. Implements ExpenseStore and GroupStore.
//!
//! One database file (`ledger.db`) in the data directory. Split lines are stored as a
//! JSON column next to the expense row; rosters keep their order through `position`.
//! Amounts are integer cents, timestamps RFC 3339 text.

use crate::domain::{
    Cents, DomainError, Expense, ExpenseId, Group, GroupId, MemberId, NewExpense,
    PaymentStatus, SplitLine, SplitType,
};
use crate::ports::{ExpenseStore, GroupStore};
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{params, Connection, Database};
use std::path::{Path, PathBuf};
use tracing::info;

const GROUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS groups (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    payment_amount INTEGER NOT NULL DEFAULT 0,
    payment_date TEXT NOT NULL,
    is_paid INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)"#;

const MEMBERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS group_members (
    group_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (group_id, member)
)"#;

const EXPENSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id TEXT PRIMARY KEY,
    group_id TEXT NOT NULL,
    title TEXT NOT NULL,
    amount INTEGER NOT NULL,
    paid_by TEXT NOT NULL,
    split_type TEXT NOT NULL,
    split_json TEXT NOT NULL,
    is_settled INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)"#;
const EXPENSES_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_expenses_group_settled \
     ON expenses (group_id, is_settled, created_at DESC)";

/// SQLite repository. Safe to share via Arc; each call opens a fresh connection.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
}

fn store_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Store(e.to_string())
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Store(format!("bad timestamp {:?}: {}", s, e)))
}

impl SqliteRepo {
    /// Connect to (or create) the database and ensure the schema exists.
    ///
    /// Sets WAL mode and synchronous=NORMAL for concurrent readers plus one writer.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(store_err)?;
        let db_path = base.join("ledger.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(store_err)?;
        let conn = db.connect().map_err(store_err)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Store(format!("{} failed: {}", pragma, e)))?;
            while rows.next().await.map_err(store_err)?.is_some() {}
        }

        for ddl in [GROUPS_TABLE, MEMBERS_TABLE, EXPENSES_TABLE, EXPENSES_INDEX] {
            conn.execute(ddl, ()).await.map_err(store_err)?;
        }

        info!(path = %db_path.display(), "SQLite ledger connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(store_err)
    }

    async fn load_members(conn: &Connection, group_id: GroupId) -> Result<Vec<MemberId>, DomainError> {
        let mut rows = conn
            .query(
                "SELECT member FROM group_members WHERE group_id = ?1 ORDER BY position",
                params![group_id.to_string()],
            )
            .await
            .map_err(store_err)?;
        let mut members = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            members.push(row.get::<String>(0).map_err(store_err)?);
        }
        Ok(members)
    }

    fn row_to_group(row: &libsql::Row, members: Vec<MemberId>) -> Result<Group, DomainError> {
        let id: String = row.get(0).map_err(store_err)?;
        let payment_date: String = row.get(3).map_err(store_err)?;
        let created_at: String = row.get(5).map_err(store_err)?;
        Ok(Group {
            id: id.parse()?,
            name: row.get(1).map_err(store_err)?,
            members,
            payment_status: PaymentStatus {
                amount: Cents::new(row.get::<i64>(2).map_err(store_err)?),
                date: parse_time(&payment_date)?,
                is_paid: row.get::<i64>(4).map_err(store_err)? != 0,
            },
            created_at: parse_time(&created_at)?,
        })
    }

    fn row_to_expense(row: &libsql::Row) -> Result<Expense, DomainError> {
        let id: String = row.get(0).map_err(store_err)?;
        let group_id: String = row.get(1).map_err(store_err)?;
        let split_type: String = row.get(5).map_err(store_err)?;
        let split_json: String = row.get(6).map_err(store_err)?;
        let created_at: String = row.get(8).map_err(store_err)?;
        let split_details: Vec<SplitLine> = serde_json::from_str(&split_json)
            .map_err(|e| DomainError::Store(format!("bad split_json for {}: {}", id, e)))?;
        Ok(Expense {
            id: id.parse()?,
            group_id: group_id.parse()?,
            title: row.get(2).map_err(store_err)?,
            amount: Cents::new(row.get::<i64>(3).map_err(store_err)?),
            paid_by: row.get(4).map_err(store_err)?,
            split_type: split_type.parse::<SplitType>()?,
            split_details,
            is_settled: row.get::<i64>(7).map_err(store_err)? != 0,
            created_at: parse_time(&created_at)?,
        })
    }
}

#[async_trait::async_trait]
impl ExpenseStore for SqliteRepo {
    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, DomainError> {
        let created = expense.into_expense(ExpenseId::new(), Utc::now());
        let split_json = serde_json::to_string(&created.split_details).map_err(store_err)?;
        self.conn()?
            .execute(
                r#"
                INSERT INTO expenses (id, group_id, title, amount, paid_by, split_type, split_json, is_settled, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
                "#,
                params![
                    created.id.to_string(),
                    created.group_id.to_string(),
                    created.title.as_str(),
                    created.amount.cents(),
                    created.paid_by.as_str(),
                    created.split_type.as_str(),
                    split_json,
                    format_time(created.created_at)
                ],
            )
            .await
            .map_err(store_err)?;
        Ok(created)
    }

    async fn list_expenses(
        &self,
        group_id: GroupId,
        settled: bool,
    ) -> Result<Vec<Expense>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT id, group_id, title, amount, paid_by, split_type, split_json, is_settled, created_at
                FROM expenses
                WHERE group_id = ?1 AND is_settled = ?2
                ORDER BY created_at DESC, rowid DESC
                "#,
                params![group_id.to_string(), settled as i64],
            )
            .await
            .map_err(store_err)?;
        let mut expenses = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            expenses.push(Self::row_to_expense(&row)?);
        }
        Ok(expenses)
    }

    async fn mark_group_settled(&self, group_id: GroupId) -> Result<u64, DomainError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE expenses SET is_settled = 1 WHERE group_id = ?1 AND is_settled = 0",
                params![group_id.to_string()],
            )
            .await
            .map_err(store_err)?;
        info!(group_id = %group_id, changed, "expenses marked settled");
        Ok(changed)
    }
}

#[async_trait::async_trait]
impl GroupStore for SqliteRepo {
    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, name, payment_amount, payment_date, is_paid, created_at FROM groups WHERE id = ?1",
                params![group_id.to_string()],
            )
            .await
            .map_err(store_err)?;
        let Some(row) = rows.next().await.map_err(store_err)? else {
            return Ok(None);
        };
        let members = Self::load_members(&conn, group_id).await?;
        Self::row_to_group(&row, members).map(Some)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, name, payment_amount, payment_date, is_paid, created_at FROM groups ORDER BY created_at",
                (),
            )
            .await
            .map_err(store_err)?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let group = Self::row_to_group(&row, Vec::new())?;
            groups.push(group);
        }
        for group in &mut groups {
            group.members = Self::load_members(&conn, group.id).await?;
        }
        Ok(groups)
    }

    async fn create_group(&self, name: &str, members: &[MemberId]) -> Result<Group, DomainError> {
        let now = Utc::now();
        let mut roster: Vec<MemberId> = Vec::with_capacity(members.len());
        for m in members {
            if !roster.contains(m) {
                roster.push(m.clone());
            }
        }
        let group = Group {
            id: GroupId::new(),
            name: name.to_string(),
            members: roster,
            payment_status: PaymentStatus::pending(now),
            created_at: now,
        };

        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(store_err)?;
        tx.execute(
            r#"
            INSERT INTO groups (id, name, payment_amount, payment_date, is_paid, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                group.id.to_string(),
                group.name.as_str(),
                group.payment_status.amount.cents(),
                format_time(group.payment_status.date),
                group.payment_status.is_paid as i64,
                format_time(group.created_at)
            ],
        )
        .await
        .map_err(store_err)?;
        for (position, member) in group.members.iter().enumerate() {
            tx.execute(
                "INSERT INTO group_members (group_id, position, member) VALUES (?1, ?2, ?3)",
                params![group.id.to_string(), position as i64, member.as_str()],
            )
            .await
            .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;

        info!(group_id = %group.id, members = group.members.len(), "group created");
        Ok(group)
    }

    async fn set_payment_status(
        &self,
        group_id: GroupId,
        status: PaymentStatus,
    ) -> Result<(), DomainError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE groups SET payment_amount = ?2, payment_date = ?3, is_paid = ?4 WHERE id = ?1",
                params![
                    group_id.to_string(),
                    status.amount.cents(),
                    format_time(status.date),
                    status.is_paid as i64
                ],
            )
            .await
            .map_err(store_err)?;
        if changed == 0 {
            return Err(DomainError::NotFound { group_id });
        }
        Ok(())
    }
}
