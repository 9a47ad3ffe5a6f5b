//! The persisted permission record.

use serde::{Deserialize, Serialize};

use crate::descriptor::Identity;
use crate::error::Result;
use crate::types::{IdentityKey, Level};

/// One grant of a level to an (entity, resource) identity.
///
/// Timestamps are Unix milliseconds. `created_at` is set on first insert and
/// never changes; `modified_at` moves on every write, so
/// `created_at <= modified_at` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: Identity,
    pub level: Level,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "modifiedAt")]
    pub modified_at: i64,
}

impl PermissionRecord {
    /// A freshly inserted record.
    pub fn inserted(id: Identity, level: Level, now: i64) -> Self {
        Self {
            id,
            level,
            created_at: now,
            modified_at: now,
        }
    }

    /// Apply an upsert to an existing record. `created_at` is kept.
    ///
    /// `modified_at` never drops below `created_at`, even when `now` is
    /// earlier than the insert.
    pub fn update(&mut self, level: Level, now: i64) {
        self.level = level;
        self.modified_at = now.max(self.created_at);
    }

    /// Content-addressed key of the record's identity.
    pub fn key(&self) -> Result<IdentityKey> {
        self.id.key()
    }
}
