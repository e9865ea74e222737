//! Group repository
//!
//! The ledger never talks to a database directly. Callers inject a
//! [`GroupRepository`] that persists raw expense/settlement records and
//! returns a consistent [`GroupHistory`] snapshot for a group.
//!
//! # Implementations
//!
//! - [`MemoryStore`] - in-process store, used for offline mode and tests
//! - [`FileStore`] - one JSON document per group under a data directory
//!
//! Writes to one group are assumed to come from a single writer; the stores
//! only guarantee that each individual operation is applied atomically.

use crate::{
    error::{Error, Result},
    types::{Expense, GroupHistory, GroupId, Member, MemberId, Settlement},
    Config,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Persistence collaborator for group histories
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Create a group with its initial roster
    async fn create_group(&self, group_id: &GroupId, members: Vec<Member>) -> Result<()>;

    /// Add a member to an existing group
    async fn add_member(&self, group_id: &GroupId, member: Member) -> Result<()>;

    /// Retrieve the current roster and full transaction history
    async fn load_group_history(&self, group_id: &GroupId) -> Result<GroupHistory>;

    /// Persist a new expense
    async fn record_expense(&self, expense: Expense) -> Result<()>;

    /// Replace an existing expense (same ID) in full
    async fn replace_expense(&self, expense: Expense) -> Result<()>;

    /// Delete an expense
    async fn delete_expense(&self, group_id: &GroupId, expense_id: Uuid) -> Result<()>;

    /// Persist a new settlement
    async fn record_settlement(&self, settlement: Settlement) -> Result<()>;

    /// Delete a settlement
    async fn delete_settlement(&self, group_id: &GroupId, settlement_id: Uuid) -> Result<()>;

    /// Replace a whole group with an imported history
    async fn import_history(&self, history: GroupHistory) -> Result<()>;
}

/// Open the repository selected by configuration
pub fn open_repository(config: &Config) -> Result<Box<dyn GroupRepository>> {
    match config.storage.backend {
        crate::config::StorageBackend::Memory => Ok(Box::new(MemoryStore::new())),
        crate::config::StorageBackend::File => Ok(Box::new(FileStore::open(&config.data_dir)?)),
    }
}

impl GroupHistory {
    fn require_member(&self, member: &MemberId) -> Result<()> {
        if self.is_member(member) {
            Ok(())
        } else {
            Err(Error::UnknownMember {
                group: self.group_id.to_string(),
                member: member.to_string(),
            })
        }
    }

    fn check_expense(&self, expense: &Expense) -> Result<()> {
        if expense.group_id != self.group_id {
            return Err(Error::InvalidExpense(format!(
                "Expense {} belongs to group {}, not {}",
                expense.expense_id, expense.group_id, self.group_id
            )));
        }
        expense.validate()?;
        for member in expense.members() {
            self.require_member(member)?;
        }
        Ok(())
    }

    fn check_settlement(&self, settlement: &Settlement) -> Result<()> {
        if settlement.group_id != self.group_id {
            return Err(Error::InvalidSettlement(format!(
                "Settlement {} belongs to group {}, not {}",
                settlement.settlement_id, settlement.group_id, self.group_id
            )));
        }
        settlement.validate()?;
        self.require_member(&settlement.payer)?;
        self.require_member(&settlement.payee)
    }

    /// Add a member, rejecting duplicates
    pub fn insert_member(&mut self, member: Member) -> Result<()> {
        if self.is_member(&member.id) {
            return Err(Error::DuplicateRecord(format!(
                "Member {} already in group {}",
                member.id, self.group_id
            )));
        }
        self.members.push(member);
        Ok(())
    }

    /// Append an expense after validating it against the roster
    pub fn insert_expense(&mut self, expense: Expense) -> Result<()> {
        self.check_expense(&expense)?;
        if self.expenses.iter().any(|e| e.expense_id == expense.expense_id) {
            return Err(Error::DuplicateRecord(format!(
                "Expense {}",
                expense.expense_id
            )));
        }
        self.expenses.push(expense);
        Ok(())
    }

    /// Replace an expense in place, keeping its position in the history
    pub fn replace_expense(&mut self, expense: Expense) -> Result<()> {
        self.check_expense(&expense)?;
        let slot = self
            .expenses
            .iter_mut()
            .find(|e| e.expense_id == expense.expense_id)
            .ok_or_else(|| Error::RecordNotFound(format!("Expense {}", expense.expense_id)))?;
        *slot = expense;
        Ok(())
    }

    /// Remove an expense
    pub fn remove_expense(&mut self, expense_id: Uuid) -> Result<Expense> {
        let index = self
            .expenses
            .iter()
            .position(|e| e.expense_id == expense_id)
            .ok_or_else(|| Error::RecordNotFound(format!("Expense {}", expense_id)))?;
        Ok(self.expenses.remove(index))
    }

    /// Append a settlement after validating it against the roster
    pub fn insert_settlement(&mut self, settlement: Settlement) -> Result<()> {
        self.check_settlement(&settlement)?;
        if self
            .settlements
            .iter()
            .any(|s| s.settlement_id == settlement.settlement_id)
        {
            return Err(Error::DuplicateRecord(format!(
                "Settlement {}",
                settlement.settlement_id
            )));
        }
        self.settlements.push(settlement);
        Ok(())
    }

    /// Remove a settlement
    pub fn remove_settlement(&mut self, settlement_id: Uuid) -> Result<Settlement> {
        let index = self
            .settlements
            .iter()
            .position(|s| s.settlement_id == settlement_id)
            .ok_or_else(|| Error::RecordNotFound(format!("Settlement {}", settlement_id)))?;
        Ok(self.settlements.remove(index))
    }

    /// Validate a complete history (used on import)
    pub fn validate(&self) -> Result<()> {
        let mut rebuilt = GroupHistory::new(self.group_id.clone(), Vec::new());
        for member in &self.members {
            rebuilt.insert_member(member.clone())?;
        }
        for expense in &self.expenses {
            rebuilt.insert_expense(expense.clone())?;
        }
        for settlement in &self.settlements {
            rebuilt.insert_settlement(settlement.clone())?;
        }
        Ok(())
    }
}

/// In-memory repository
#[derive(Debug, Default)]
pub struct MemoryStore {
    groups: DashMap<GroupId, GroupHistory>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups held
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn with_group<T>(
        &self,
        group_id: &GroupId,
        f: impl FnOnce(&mut GroupHistory) -> Result<T>,
    ) -> Result<T> {
        let mut history = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))?;

        // Mutate a copy so a failed operation leaves the group untouched
        let mut updated = history.clone();
        let result = f(&mut updated)?;
        *history = updated;
        Ok(result)
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create_group(&self, group_id: &GroupId, members: Vec<Member>) -> Result<()> {
        let mut history = GroupHistory::new(group_id.clone(), Vec::new());
        for member in members {
            history.insert_member(member)?;
        }

        match self.groups.entry(group_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::DuplicateRecord(format!(
                "Group {}",
                group_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(history);
                tracing::debug!("Created group {} in memory store", group_id);
                Ok(())
            }
        }
    }

    async fn add_member(&self, group_id: &GroupId, member: Member) -> Result<()> {
        self.with_group(group_id, |history| history.insert_member(member))
    }

    async fn load_group_history(&self, group_id: &GroupId) -> Result<GroupHistory> {
        self.groups
            .get(group_id)
            .map(|history| history.clone())
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))
    }

    async fn record_expense(&self, expense: Expense) -> Result<()> {
        let group_id = expense.group_id.clone();
        self.with_group(&group_id, |history| history.insert_expense(expense))
    }

    async fn replace_expense(&self, expense: Expense) -> Result<()> {
        let group_id = expense.group_id.clone();
        self.with_group(&group_id, |history| history.replace_expense(expense))
    }

    async fn delete_expense(&self, group_id: &GroupId, expense_id: Uuid) -> Result<()> {
        self.with_group(group_id, |history| history.remove_expense(expense_id).map(|_| ()))
    }

    async fn record_settlement(&self, settlement: Settlement) -> Result<()> {
        let group_id = settlement.group_id.clone();
        self.with_group(&group_id, |history| history.insert_settlement(settlement))
    }

    async fn delete_settlement(&self, group_id: &GroupId, settlement_id: Uuid) -> Result<()> {
        self.with_group(group_id, |history| {
            history.remove_settlement(settlement_id).map(|_| ())
        })
    }

    async fn import_history(&self, history: GroupHistory) -> Result<()> {
        history.validate()?;
        self.groups.insert(history.group_id.clone(), history);
        Ok(())
    }
}

/// File-backed repository: one JSON document per group
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,

    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open or create the store under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let root = data_dir.as_ref().join("groups");

        // Create directory if not exists
        std::fs::create_dir_all(&root)?;

        tracing::info!("Opened file store at {:?}", root);

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn group_path(&self, group_id: &GroupId) -> Result<PathBuf> {
        let id = group_id.as_str();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Storage(format!(
                "Group ID '{}' cannot be used as a file name",
                id
            )));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    async fn read(&self, group_id: &GroupId) -> Result<GroupHistory> {
        let path = self.group_path(group_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::GroupNotFound(group_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, history: &GroupHistory) -> Result<()> {
        let path = self.group_path(&history.group_id)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(history)?;

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn update<T>(
        &self,
        group_id: &GroupId,
        f: impl FnOnce(&mut GroupHistory) -> Result<T> + Send,
    ) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut history = self.read(group_id).await?;
        let result = f(&mut history)?;
        self.write(&history).await?;
        Ok(result)
    }
}

#[async_trait]
impl GroupRepository for FileStore {
    async fn create_group(&self, group_id: &GroupId, members: Vec<Member>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if tokio::fs::try_exists(self.group_path(group_id)?).await? {
            return Err(Error::DuplicateRecord(format!("Group {}", group_id)));
        }

        let mut history = GroupHistory::new(group_id.clone(), Vec::new());
        for member in members {
            history.insert_member(member)?;
        }
        self.write(&history).await?;

        tracing::info!("Created group {} with {} members", group_id, history.members.len());
        Ok(())
    }

    async fn add_member(&self, group_id: &GroupId, member: Member) -> Result<()> {
        self.update(group_id, |history| history.insert_member(member))
            .await
    }

    async fn load_group_history(&self, group_id: &GroupId) -> Result<GroupHistory> {
        self.read(group_id).await
    }

    async fn record_expense(&self, expense: Expense) -> Result<()> {
        let group_id = expense.group_id.clone();
        self.update(&group_id, |history| history.insert_expense(expense))
            .await
    }

    async fn replace_expense(&self, expense: Expense) -> Result<()> {
        let group_id = expense.group_id.clone();
        self.update(&group_id, |history| history.replace_expense(expense))
            .await
    }

    async fn delete_expense(&self, group_id: &GroupId, expense_id: Uuid) -> Result<()> {
        self.update(group_id, |history| history.remove_expense(expense_id).map(|_| ()))
            .await
    }

    async fn record_settlement(&self, settlement: Settlement) -> Result<()> {
        let group_id = settlement.group_id.clone();
        self.update(&group_id, |history| history.insert_settlement(settlement))
            .await
    }

    async fn delete_settlement(&self, group_id: &GroupId, settlement_id: Uuid) -> Result<()> {
        self.update(group_id, |history| {
            history.remove_settlement(settlement_id).map(|_| ())
        })
        .await
    }

    async fn import_history(&self, history: GroupHistory) -> Result<()> {
        history.validate()?;
        let _guard = self.write_lock.lock().await;
        self.write(&history).await?;
        tracing::info!(
            "Imported group {} ({} expenses, {} settlements)",
            history.group_id,
            history.expenses.len(),
            history.settlements.len()
        );
        Ok(())
    }
}
