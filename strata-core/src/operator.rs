//! Operator capability descriptor
//!
//! Every write operation accepts an operator. The core does not enforce
//! authorization; it only records attribution when the operator carries a
//! user or integration identity.

use crate::id::{IntegrationId, UserId};
use serde::{Deserialize, Serialize};

/// Identity performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operator {
    User { id: UserId },
    Integration { id: IntegrationId },
    /// Internal process with no recordable identity
    Machine,
}

impl Operator {
    pub fn user(id: UserId) -> Self {
        Self::User { id }
    }

    pub fn integration(id: IntegrationId) -> Self {
        Self::Integration { id }
    }

    /// User identity, if this operator is a user
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User { id } => Some(*id),
            _ => None,
        }
    }

    /// Integration identity, if this operator is an integration
    pub fn integration_id(&self) -> Option<IntegrationId> {
        match self {
            Self::Integration { id } => Some(*id),
            _ => None,
        }
    }

    pub fn is_machine(&self) -> bool {
        matches!(self, Self::Machine)
    }

    /// Attribution recorded on items, when an identity is present
    pub fn attribution(&self) -> Option<Operator> {
        match self {
            Self::Machine => None,
            other => Some(*other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_identity() {
        let user = UserId::new();
        let op = Operator::user(user);
        assert_eq!(op.user_id(), Some(user));
        assert_eq!(op.integration_id(), None);
        assert_eq!(op.attribution(), Some(op));

        let op = Operator::Machine;
        assert!(op.is_machine());
        assert_eq!(op.attribution(), None);
    }
}
