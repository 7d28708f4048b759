//! Implements InputPort. Inquire-based interactive console over the ledger.
//!
//! Validation, export and prompt problems are shown and the menu continues; store failures end the session.

use crate::adapters::export::write_history_csv;
use crate::adapters::ui::banner;
use crate::domain::{
    Cents, DomainError, Group, GroupId, MemberId, NewExpense, SplitLine, SplitType,
};
use crate::ports::{GroupStore, InputPort};
use crate::usecases::{GroupSummary, LedgerService};
use async_trait::async_trait;
use chrono::Utc;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, CustomType, MultiSelect, Select, Text};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Applies the console prompt theme globally.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightCyan))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(Color::LightGreen));
    inquire::set_global_render_config(config);
}

fn ui_err(e: inquire::InquireError) -> DomainError {
    DomainError::Ui(e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Summary,
    AddExpense,
    RecordPayment,
    SettleMine,
    ArchiveGroup,
    History,
    Export,
    SwitchGroup,
    Exit,
}

impl MenuItem {
    const ALL: [MenuItem; 9] = [
        MenuItem::Summary,
        MenuItem::AddExpense,
        MenuItem::RecordPayment,
        MenuItem::SettleMine,
        MenuItem::ArchiveGroup,
        MenuItem::History,
        MenuItem::Export,
        MenuItem::SwitchGroup,
        MenuItem::Exit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuItem::Summary => "Balances & suggested transfers",
            MenuItem::AddExpense => "Add expense",
            MenuItem::RecordPayment => "Record payment",
            MenuItem::SettleMine => "Settle my debts",
            MenuItem::ArchiveGroup => "Settle group (archive everything)",
            MenuItem::History => "Expense history",
            MenuItem::Export => "Export history to CSV",
            MenuItem::SwitchGroup => "Switch group",
            MenuItem::Exit => "Exit",
        };
        f.write_str(label)
    }
}

/// Console adapter. Inquire prompts in a menu loop.
pub struct ConsoleInputPort {
    ledger: Arc<LedgerService>,
    groups: Arc<dyn GroupStore>,
    /// Acting member for "settle my debts" and as the default payer.
    member: Option<MemberId>,
    default_group: Option<GroupId>,
    export_dir: PathBuf,
}

impl ConsoleInputPort {
    pub fn new(
        ledger: Arc<LedgerService>,
        groups: Arc<dyn GroupStore>,
        member: Option<MemberId>,
        default_group: Option<GroupId>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            ledger,
            groups,
            member,
            default_group,
            export_dir,
        }
    }

    /// Pick an existing group or create one. `None` when the user creates nothing.
    async fn choose_group(&self) -> Result<Option<GroupId>, DomainError> {
        const CREATE: &str = "+ Create a new group";
        let groups = self.groups.list_groups().await?;
        let mut options: Vec<String> = groups
            .iter()
            .map(|g| format!("{} ({} members) {}", g.name, g.members.len(), g.id))
            .collect();
        options.push(CREATE.to_string());

        let picked = Select::new("Group:", options).prompt().map_err(ui_err)?;
        if picked == CREATE {
            return self.create_group().await.map(|g| g.map(|g| g.id));
        }
        Ok(groups
            .iter()
            .find(|g| picked.ends_with(&g.id.to_string()))
            .map(|g| g.id))
    }

    async fn create_group(&self) -> Result<Option<Group>, DomainError> {
        let name = Text::new("Group name:").prompt().map_err(ui_err)?;
        if name.trim().is_empty() {
            return Ok(None);
        }
        let raw = Text::new("Members (comma-separated emails):")
            .prompt()
            .map_err(ui_err)?;
        let mut members: Vec<MemberId> = self.member.iter().cloned().collect();
        members.extend(
            raw.split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        );
        let group = self.groups.create_group(name.trim(), &members).await?;
        println!("Created group {} ({})", group.name, group.id);
        Ok(Some(group))
    }

    async fn load_group(&self, group_id: GroupId) -> Result<Group, DomainError> {
        self.groups
            .get_group(group_id)
            .await?
            .ok_or(DomainError::NotFound { group_id })
    }

    /// Roster with the acting member first, so it is the default selection.
    fn members_acting_first(&self, group: &Group) -> Vec<MemberId> {
        let mut members = group.members.clone();
        if let Some(me) = &self.member {
            if let Some(pos) = members.iter().position(|m| m == me) {
                let me = members.remove(pos);
                members.insert(0, me);
            }
        }
        members
    }

    async fn show_summary(&self, group_id: GroupId) -> Result<(), DomainError> {
        let summary = self.ledger.get_group_summary(group_id).await?;
        print_summary(&summary);
        Ok(())
    }

    async fn add_expense(&self, group: &Group) -> Result<(), DomainError> {
        if group.members.is_empty() {
            return Err(DomainError::Validation("group has no members".into()));
        }
        let title = Text::new("Title:").prompt().map_err(ui_err)?;
        let amount = CustomType::<Cents>::new("Amount:")
            .with_error_message("Enter an amount like 12.50")
            .prompt()
            .map_err(ui_err)?;
        let paid_by = Select::new("Paid by:", self.members_acting_first(group))
            .prompt()
            .map_err(ui_err)?;
        let split_type = Select::new("Split:", vec!["equal", "unequal"])
            .prompt()
            .map_err(ui_err)?
            .parse::<SplitType>()?;

        let split_details = match split_type {
            SplitType::Equal => {
                let excluded = MultiSelect::new("Exclude anyone?", group.members.clone())
                    .prompt()
                    .map_err(ui_err)?;
                SplitLine::equal_shares(amount, &group.members, &excluded)
            }
            SplitType::Unequal => {
                let mut lines = Vec::with_capacity(group.members.len());
                for member in &group.members {
                    let share = CustomType::<Cents>::new(&format!("Share for {}:", member))
                        .with_default(Cents::ZERO)
                        .prompt()
                        .map_err(ui_err)?;
                    lines.push(if share.is_zero() {
                        SplitLine::excluded(member.clone())
                    } else {
                        SplitLine::share(member.clone(), share)
                    });
                }
                lines
            }
        };

        let expense = self
            .ledger
            .add_expense(NewExpense {
                group_id: group.id,
                title,
                amount,
                paid_by,
                split_type,
                split_details,
            })
            .await?;
        println!("Added {} ({})", expense.title, expense.amount);
        Ok(())
    }

    async fn record_payment(&self, group: &Group) -> Result<(), DomainError> {
        let from = Select::new("Who paid?", self.members_acting_first(group))
            .prompt()
            .map_err(ui_err)?;
        let others: Vec<MemberId> = group.members.iter().filter(|m| **m != from).cloned().collect();
        if others.is_empty() {
            return Err(DomainError::Validation("nobody to pay".into()));
        }
        let to = Select::new("Paid to:", others).prompt().map_err(ui_err)?;
        let amount = CustomType::<Cents>::new("Amount:")
            .with_error_message("Enter an amount like 12.50")
            .prompt()
            .map_err(ui_err)?;

        let payment = self
            .ledger
            .record_payment(group.id, &from, &to, amount)
            .await?;
        println!("Recorded {} ({})", payment.title, payment.amount);
        self.report_state(group.id).await
    }

    async fn settle_mine(&self, group: &Group) -> Result<(), DomainError> {
        let member = match &self.member {
            Some(m) => m.clone(),
            None => Select::new("Settle debts for:", group.members.clone())
                .prompt()
                .map_err(ui_err)?,
        };
        let recorded = self.ledger.settle_user_debts(group.id, &member).await?;
        if recorded.is_empty() {
            println!("{} has nothing to settle.", member);
            return Ok(());
        }
        for e in &recorded {
            println!("Recorded {} ({})", e.title, e.amount);
        }
        self.report_state(group.id).await
    }

    async fn archive_group(&self, group: &Group) -> Result<(), DomainError> {
        let sure = Confirm::new(&format!(
            "Archive every open expense in {}? Balances restart from zero.",
            group.name
        ))
        .with_default(false)
        .prompt()
        .map_err(ui_err)?;
        if !sure {
            return Ok(());
        }
        let archived = self.ledger.settle_group(group.id).await?;
        println!("Archived {} expenses.", archived);
        Ok(())
    }

    async fn show_history(&self, group_id: GroupId) -> Result<(), DomainError> {
        let active = self.ledger.active_expenses(group_id).await?;
        let settled = self.ledger.settled_history(group_id).await?;
        println!("Open ({}):", active.len());
        for e in &active {
            println!(
                "  {}  {:<32} {:>10}  paid by {}",
                e.created_at.format("%Y-%m-%d"),
                e.title,
                e.amount.to_string(),
                e.paid_by
            );
        }
        println!("Archived ({}):", settled.len());
        for e in &settled {
            println!(
                "  {}  {:<32} {:>10}  paid by {}",
                e.created_at.format("%Y-%m-%d"),
                e.title,
                e.amount.to_string(),
                e.paid_by
            );
        }
        Ok(())
    }

    async fn export(&self, group_id: GroupId) -> Result<(), DomainError> {
        let mut expenses = self.ledger.active_expenses(group_id).await?;
        expenses.extend(self.ledger.settled_history(group_id).await?);
        let stem = format!("history_{}_{}", group_id, Utc::now().format("%Y%m%d-%H%M%S"));
        let path = write_history_csv(&self.export_dir, &stem, &expenses).await?;
        println!("Wrote {}", path.display());
        Ok(())
    }

    async fn report_state(&self, group_id: GroupId) -> Result<(), DomainError> {
        let state = self.ledger.ledger_state(group_id).await?;
        println!("Group is now {}.", state);
        Ok(())
    }
}

fn print_summary(summary: &GroupSummary) {
    println!("Balances:");
    for (member, amount) in summary.balances.iter() {
        banner::print_balance_row(member, amount);
    }
    if summary.transfers.is_empty() {
        println!("Nothing to settle.");
    } else {
        println!("Suggested transfers:");
        for t in &summary.transfers {
            println!("  {}", t);
        }
    }
    if let Some(c) = &summary.correction {
        println!(
            "Note: a rounding residue of {} was absorbed by {}.",
            c.residue, c.member
        );
    }
}

#[async_trait]
impl InputPort for ConsoleInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let mut current = match self.default_group {
            Some(id) => id,
            None => match self.choose_group().await? {
                Some(id) => id,
                None => return Ok(()),
            },
        };

        loop {
            let group = self.load_group(current).await?;
            let state = self.ledger.ledger_state(current).await?;
            let prompt = format!("{} [{}]:", group.name, state);
            let choice = Select::new(&prompt, MenuItem::ALL.to_vec())
                .prompt()
                .map_err(ui_err)?;

            let outcome = match choice {
                MenuItem::Exit => return Ok(()),
                MenuItem::SwitchGroup => {
                    if let Some(id) = self.choose_group().await? {
                        current = id;
                    }
                    Ok(())
                }
                MenuItem::Summary => self.show_summary(current).await,
                MenuItem::AddExpense => self.add_expense(&group).await,
                MenuItem::RecordPayment => self.record_payment(&group).await,
                MenuItem::SettleMine => self.settle_mine(&group).await,
                MenuItem::ArchiveGroup => self.archive_group(&group).await,
                MenuItem::History => self.show_history(current).await,
                MenuItem::Export => self.export(current).await,
            };

            match outcome {
                Ok(()) => {}
                Err(e @ (DomainError::Validation(_) | DomainError::Export(_) | DomainError::Ui(_))) => {
                    warn!(error = %e, "action not completed");
                    println!("{}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
