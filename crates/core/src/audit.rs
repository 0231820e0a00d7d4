//! Audit metadata carried by every persisted billing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tuition_shared::types::UserId;

/// Who created and last touched a record, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// The user who created the record.
    pub created_by: UserId,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
    /// The user who last modified the record.
    pub updated_by: UserId,
}

impl AuditStamp {
    /// Stamp for a record created now by `actor`.
    #[must_use]
    pub fn created(actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by: actor,
            updated_at: at,
            updated_by: actor,
        }
    }

    /// Returns a copy marked as modified by `actor` at `at`.
    #[must_use]
    pub fn touched(self, actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            updated_at: at,
            updated_by: actor,
            ..self
        }
    }
}
