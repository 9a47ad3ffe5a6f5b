//! Requester level resolution.
//!
//! Authentication happens elsewhere. By the time a request reaches keyward
//! the caller knows whether it is anonymous, an ordinary account with an
//! optional level, or a superuser; this module turns that into the integer
//! level the content gate consumes.

use crate::types::Level;

/// An already-authenticated requester.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Requester {
    #[default]
    Anonymous,
    Account {
        level: Option<i64>,
        superuser: bool,
    },
}

impl Requester {
    /// An ordinary account holding `level`.
    pub const fn account(level: i64) -> Self {
        Requester::Account {
            level: Some(level),
            superuser: false,
        }
    }

    /// A superuser account.
    pub const fn superuser() -> Self {
        Requester::Account {
            level: None,
            superuser: true,
        }
    }

    /// Resolve the level used by the content gate.
    ///
    /// Anonymous requests and accounts without a level resolve to 0.
    /// Superusers resolve to `elevated`, whatever their own level is.
    pub fn resolve_level(&self, elevated: Level) -> Level {
        match self {
            Requester::Anonymous => Level::NONE,
            Requester::Account {
                superuser: true, ..
            } => elevated,
            Requester::Account { level, .. } => Level(level.unwrap_or(0)),
        }
    }
}
