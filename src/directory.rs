use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;
use ulid::Ulid;

use crate::model::{Principal, Role};

/// One row of the directory file.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub id: Ulid,
    pub role: Role,
}

/// The user-directory collaborator: login name → `{id, role}`.
///
/// Loaded once at startup from a JSON array of entries. The wire layer
/// resolves every connection's login user through this before a single
/// command runs; the resolver only ever sees a typed `Principal`.
pub struct UserDirectory {
    users: HashMap<String, (Ulid, Role)>,
}

impl UserDirectory {
    /// Load from a JSON file: `[{"name": "...", "id": "<ULID>", "role": "renter"|"owner"}, ...]`.
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<DirectoryEntry> = serde_json::from_str(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        let users = entries
            .into_iter()
            .map(|e| (e.name, (e.id, e.role)))
            .collect();
        Self { users }
    }

    /// Directory with a single `owner` principal. Used when no directory
    /// file is configured, so a fresh server is administrable out of the
    /// box.
    pub fn bootstrap() -> Self {
        let mut users = HashMap::new();
        users.insert("owner".to_string(), (Ulid::nil(), Role::Owner));
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Resolve a login name to its principal. `None` means the name is
    /// unknown and the connection must be refused.
    pub fn resolve(&self, name: &str) -> Option<Principal> {
        self.users.get(name).map(|(id, role)| Principal {
            id: *id,
            name: name.to_string(),
            role: *role,
        })
    }
}
