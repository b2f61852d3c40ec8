//! Catalog publication workflow.
//!
//! `pending_approval -> approved -> published`, and `published -> approved`
//! to take a catalog down again. Anything else is rejected.

use faves_core::models::CatalogStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTransition {
    Approve,
    Publish,
    Revert,
}

impl CatalogTransition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Publish => "publish",
            Self::Revert => "revert",
        }
    }

    /// The status reached from `from`, or `None` when the move is not allowed.
    pub const fn apply(self, from: CatalogStatus) -> Option<CatalogStatus> {
        match (self, from) {
            (Self::Approve, CatalogStatus::PendingApproval)
            | (Self::Revert, CatalogStatus::Published) => Some(CatalogStatus::Approved),
            (Self::Publish, CatalogStatus::Approved) => Some(CatalogStatus::Published),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_transitions() {
        assert_eq!(
            CatalogTransition::Approve.apply(CatalogStatus::PendingApproval),
            Some(CatalogStatus::Approved)
        );
        assert_eq!(
            CatalogTransition::Publish.apply(CatalogStatus::Approved),
            Some(CatalogStatus::Published)
        );
        assert_eq!(
            CatalogTransition::Revert.apply(CatalogStatus::Published),
            Some(CatalogStatus::Approved)
        );
    }

    #[test]
    fn rejected_transitions() {
        assert_eq!(CatalogTransition::Publish.apply(CatalogStatus::PendingApproval), None);
        assert_eq!(CatalogTransition::Approve.apply(CatalogStatus::Approved), None);
        assert_eq!(CatalogTransition::Approve.apply(CatalogStatus::Published), None);
        assert_eq!(CatalogTransition::Revert.apply(CatalogStatus::Approved), None);
        assert_eq!(CatalogTransition::Revert.apply(CatalogStatus::PendingApproval), None);
        assert_eq!(CatalogTransition::Publish.apply(CatalogStatus::Published), None);
    }
}
