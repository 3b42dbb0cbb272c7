use crate::classify::PendingUpdateQueue;
use crate::table::Table;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// One operator's mutable working state.
///
/// The table and the pending queue live here instead of in process-wide
/// globals, so two simultaneous operator sessions can never read or
/// clobber each other's pipeline state.
#[derive(Debug, Default)]
pub struct Workspace {
    /// The current table; every pipeline stage reads and replaces it.
    pub table: Option<Table>,

    /// Classification intents queued for the next batch apply.
    pub pending: PendingUpdateQueue,

    /// Path of the most recently uploaded file, if any.
    pub upload: Option<PathBuf>,

    /// When the current table was loaded.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Map from session identity to workspace.
///
/// The host owns one store and scopes every pipeline call through it; the
/// write lock is held only for the duration of a single synchronous
/// operation, which serializes the stages of one session without any
/// locking inside the pipeline itself.
#[derive(Debug, Default)]
pub struct WorkspaceStore {
    workspaces: RwLock<HashMap<String, Workspace>>,
}

impl WorkspaceStore {
    pub fn new() -> WorkspaceStore {
        WorkspaceStore::default()
    }

    /// Run `f` against the identity's workspace, creating an empty one on
    /// first use.
    pub fn with<F, R>(&self, identity: &str, f: F) -> R
    where
        F: FnOnce(&mut Workspace) -> R,
    {
        let mut workspaces = self.workspaces.write().unwrap();
        let workspace = workspaces.entry(identity.to_string()).or_default();
        f(workspace)
    }

    /// Discard an identity's workspace and delete its upload directory.
    pub fn remove(&self, identity: &str) {
        let workspace = self.workspaces.write().unwrap().remove(identity);
        if let Some(workspace) = workspace {
            if let Some(dir) = workspace.upload.as_ref().and_then(|p| p.parent()) {
                if let Err(e) = fs::remove_dir_all(dir) {
                    log::warn!("failed to remove upload directory {}: {}", dir.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;
    use std::fs::File;
    use std::io::Write;

    fn small_table() -> Table {
        Table::load(
            vec!["Site".to_string()],
            vec![vec!["A".to_string()]],
            &[],
        )
        .unwrap()
    }

    #[test]
    fn with_creates_workspace_on_first_use() {
        let store = WorkspaceStore::new();
        let empty = store.with("alice", |ws| ws.table.is_none());
        assert!(empty);
    }

    #[test]
    fn mutations_persist_between_calls() {
        let store = WorkspaceStore::new();
        store.with("alice", |ws| {
            ws.table = Some(small_table());
            ws.pending.enqueue("A", "IT");
            ws.loaded_at = Some(Utc::now());
        });

        store.with("alice", |ws| {
            assert_eq!(ws.pending.len(), 1);
            let table = ws.table.as_mut().unwrap();
            table
                .set_cell(0, "Site", CellValue::Text("B".to_string()))
                .unwrap();
        });

        let site = store.with("alice", |ws| {
            ws.table.as_ref().unwrap().cell(0, "Site").unwrap().render()
        });
        assert_eq!(site, "B");
    }

    #[test]
    fn workspaces_are_isolated_per_identity() {
        let store = WorkspaceStore::new();
        store.with("alice", |ws| ws.pending.enqueue("A", "IT"));
        let bob_pending = store.with("bob", |ws| ws.pending.len());
        assert_eq!(bob_pending, 0);
    }

    #[test]
    fn remove_discards_state_and_upload_directory() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("alice");
        fs::create_dir_all(&user_dir).unwrap();
        let upload = user_dir.join("inventory.csv");
        let mut file = File::create(&upload).unwrap();
        file.write_all(b"Site\nA\n").unwrap();

        let store = WorkspaceStore::new();
        store.with("alice", |ws| {
            ws.table = Some(small_table());
            ws.upload = Some(upload.clone());
        });

        store.remove("alice");
        assert!(!user_dir.exists());
        let fresh = store.with("alice", |ws| ws.table.is_none());
        assert!(fresh);
    }
}
