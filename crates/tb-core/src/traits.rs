//! Core traits shared across the workspace

use chrono::{DateTime, Utc};

/// Primary key type for every entity
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}

/// Trait for entities with timestamps
pub trait Timestamped {
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn updated_at(&self) -> Option<DateTime<Utc>>;
}

/// Resolved actor for permission checks.
///
/// The auth middleware produces one of these; core logic never re-derives
/// identity itself.
pub trait UserContext: Send + Sync {
    fn user_id(&self) -> Id;
    fn is_admin(&self) -> bool;
    fn is_team_lead(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: Option<Id>,
    }

    impl Identifiable for Dummy {
        fn id(&self) -> Option<Id> {
            self.id
        }
    }

    #[test]
    fn test_is_persisted() {
        assert!(Dummy { id: Some(1) }.is_persisted());
        assert!(!Dummy { id: None }.is_persisted());
    }
}
