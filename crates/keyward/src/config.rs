//! Configuration for the permission layer.

use keyward_core::Level;

/// How mutations and reads issued through one [`Acl`](crate::Acl) are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Consistency {
    /// No in-process ordering. Concurrent writes to one identity race at the
    /// store and the later write wins; `created_at` stays from the first
    /// insert.
    #[default]
    LastWriteWins,
    /// Writes take an exclusive lock and reads a shared one, so a read
    /// issued after a write through the same `Acl` observes it.
    Serialized,
}

/// What to do with an empty descriptor where a keyed lookup is expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DescriptorPolicy {
    /// Let the query degrade: the missing constraint is simply not applied.
    #[default]
    Lenient,
    /// Reject the call with `AclError::MalformedInput`.
    Strict,
}

/// Configuration for an [`Acl`](crate::Acl).
#[derive(Debug, Clone)]
pub struct AclConfig {
    /// Ordering of operations issued through one `Acl`.
    pub consistency: Consistency,
    /// Handling of empty descriptors.
    pub descriptor_policy: DescriptorPolicy,
    /// Level handed to superuser requesters when serving gated assets.
    pub elevated_level: Level,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            consistency: Consistency::LastWriteWins,
            descriptor_policy: DescriptorPolicy::Lenient,
            elevated_level: Level::ELEVATED,
        }
    }
}

impl AclConfig {
    pub fn serialized(mut self) -> Self {
        self.consistency = Consistency::Serialized;
        self
    }

    pub fn strict(mut self) -> Self {
        self.descriptor_policy = DescriptorPolicy::Strict;
        self
    }
}
