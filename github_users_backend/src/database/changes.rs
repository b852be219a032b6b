//! Table-level change notification for live reads.
//!
//! Every committed write bumps a generation counter for each table it
//! touched. Live queries hold a [`watch::Receiver`] on the counter of the
//! table they read and re-run when it moves. Rolled back transactions never
//! reach [`ChangeTracker::publish`].

use std::cell::Cell;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    UserDetails,
    RemoteKeys,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Users, Table::UserDetails, Table::RemoteKeys];

    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "github_users",
            Table::UserDetails => "github_user_details",
            Table::RemoteKeys => "remote_keys",
        }
    }
}

/// Tables written through one repository handle, collected until the
/// surrounding write is known to have committed.
#[derive(Debug, Default)]
pub struct TouchedTables {
    users: Cell<bool>,
    user_details: Cell<bool>,
    remote_keys: Cell<bool>,
}

impl TouchedTables {
    pub fn mark(&self, table: Table) {
        self.flag(table).set(true);
    }

    pub fn take(&self) -> Vec<Table> {
        Table::ALL
            .into_iter()
            .filter(|table| self.flag(*table).replace(false))
            .collect()
    }

    fn flag(&self, table: Table) -> &Cell<bool> {
        match table {
            Table::Users => &self.users,
            Table::UserDetails => &self.user_details,
            Table::RemoteKeys => &self.remote_keys,
        }
    }
}

#[derive(Debug)]
pub struct ChangeTracker {
    users: watch::Sender<u64>,
    user_details: watch::Sender<u64>,
    remote_keys: watch::Sender<u64>,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self {
            users: watch::channel(0).0,
            user_details: watch::channel(0).0,
            remote_keys: watch::channel(0).0,
        }
    }

    pub fn subscribe(&self, table: Table) -> watch::Receiver<u64> {
        self.sender(table).subscribe()
    }

    pub fn generation(&self, table: Table) -> u64 {
        *self.sender(table).borrow()
    }

    pub fn publish(&self, tables: &[Table]) {
        for table in tables {
            self.sender(*table).send_modify(|generation| *generation += 1);
            tracing::trace!(table = table.name(), "table invalidated");
        }
    }

    fn sender(&self, table: Table) -> &watch::Sender<u64> {
        match table {
            Table::Users => &self.users,
            Table::UserDetails => &self.user_details,
            Table::RemoteKeys => &self.remote_keys,
        }
    }
}
