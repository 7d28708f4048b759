//! CSV export of expense history. Uses the `csv` crate for quoting/escaping.
//!
//! Semicolon-delimited, one row per expense, amounts as decimals.

use crate::domain::{DomainError, Expense};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

const HEADER: [&str; 7] = ["Date", "Title", "Paid by", "Amount", "Split", "Shares", "Status"];

/// Convert expenses to a CSV string with a header row.
///
/// The `Shares` column lists `member=amount` pairs; excluded members show as `member=excluded`.
pub fn expenses_to_csv(expenses: &[Expense]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;

    for e in expenses {
        let date = e.created_at.format("%Y-%m-%d %H:%M").to_string();
        let amount = e.amount.to_string();
        let shares = e
            .split_details
            .iter()
            .map(|l| {
                if l.excluded {
                    format!("{}=excluded", l.member)
                } else {
                    format!("{}={}", l.member, l.amount)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let status = if e.is_settled { "settled" } else { "active" };
        // Titles are user text; flatten newlines so one expense stays one line.
        let title = e.title.replace('\n', " ").replace('\r', "");

        wtr.write_record([
            date.as_str(),
            title.as_str(),
            e.paid_by.as_str(),
            amount.as_str(),
            e.split_type.as_str(),
            shares.as_str(),
            status,
        ])?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))
    })?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

/// Write `expenses` to `<dir>/<file_stem>.csv`, creating the directory if needed.
pub async fn write_history_csv(
    dir: &Path,
    file_stem: &str,
    expenses: &[Expense],
) -> Result<PathBuf, DomainError> {
    let csv = expenses_to_csv(expenses).map_err(|e| DomainError::Export(e.to_string()))?;
    fs::create_dir_all(dir)
        .await
        .map_err(|e| DomainError::Export(format!("create export dir: {}", e)))?;
    let path = dir.join(format!("{}.csv", file_stem));
    fs::write(&path, csv)
        .await
        .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;

    info!(path = %path.display(), rows = expenses.len(), "history exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cents, ExpenseId, GroupId, SplitLine, SplitType};
    use chrono::{TimeZone, Utc};

    fn sample() -> Expense {
        Expense {
            id: ExpenseId::new(),
            group_id: GroupId::new(),
            title: "Dinner; \"fancy\"\nplace".into(),
            amount: Cents::new(9000),
            paid_by: "alice@example.com".into(),
            split_type: SplitType::Equal,
            split_details: vec![
                SplitLine::share("alice@example.com", Cents::new(4500)),
                SplitLine::share("bob@example.com", Cents::new(4500)),
                SplitLine::excluded("carol@example.com"),
            ],
            is_settled: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn renders_header_and_row() {
        let csv = expenses_to_csv(&[sample()]).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("Date;Title;Paid by;Amount;Split;Shares;Status")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("2024-01-01 12:30;"));
        assert!(row.contains("90.00"));
        assert!(row.contains("bob@example.com=45.00"));
        assert!(row.contains("carol@example.com=excluded"));
        assert!(row.ends_with(";settled"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_history_is_header_only() {
        let csv = expenses_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
