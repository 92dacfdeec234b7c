//! Shared test helpers for output module tests.

use crate::model::{Change, ChangeKind, ChangeLogDocument, ChangeSet};

/// A one-change-set document renaming `orders` to `purchases`.
pub fn test_document() -> ChangeLogDocument {
    let mut document = ChangeLogDocument::new("db/main.changelog");
    let mut change_set = ChangeSet::new("rename-orders", "alice", "db/main.changelog");
    let mut rename = Change::new(ChangeKind::RenameTable);
    rename.attributes.insert("oldTableName", "orders");
    rename.attributes.insert("newTableName", "purchases");
    change_set.changes.push(rename);
    change_set
        .rollback
        .push(Change::raw_sql("alter table purchases rename to orders"));
    document.change_sets.push(change_set);
    document
}
