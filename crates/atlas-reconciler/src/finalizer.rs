//! Cooperative finalizer token gating remote deletion.

use crate::resource::ObservedStatus;

/// Token recorded before any remote delete call is issued.
pub const FINALIZER: &str = "organization.atlas.provider/cleanup";

/// Where a resource is in the deletion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerState {
    NoFinalizer,
    FinalizerPresent,
    Deleting,
    Removed,
}

/// Derives the protocol state from the observed status.
#[must_use]
pub fn state(status: &ObservedStatus) -> FinalizerState {
    match (&status.deletion_marker, status.deleted_at) {
        (None, None) => FinalizerState::NoFinalizer,
        (None, Some(_)) => FinalizerState::Removed,
        (Some(_), None) => FinalizerState::FinalizerPresent,
        (Some(_), Some(_)) => FinalizerState::Deleting,
    }
}

#[must_use]
pub fn has_finalizer(status: &ObservedStatus) -> bool {
    status.deletion_marker.as_deref() == Some(FINALIZER)
}

/// Records the token. Returns `false` if it was already present.
pub fn add_finalizer(status: &mut ObservedStatus) -> bool {
    if has_finalizer(status) {
        return false;
    }
    status.deletion_marker = Some(FINALIZER.to_string());
    true
}

/// Removes the token. Returns `false` if it was absent.
pub fn remove_finalizer(status: &mut ObservedStatus) -> bool {
    status.deletion_marker.take().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn test_state_transitions() {
        let mut status = ObservedStatus::default();
        assert_eq!(state(&status), FinalizerState::NoFinalizer);

        assert!(add_finalizer(&mut status));
        assert!(!add_finalizer(&mut status));
        assert_eq!(state(&status), FinalizerState::FinalizerPresent);

        status.deleted_at = Some(OffsetDateTime::now_utc());
        assert_eq!(state(&status), FinalizerState::Deleting);

        assert!(remove_finalizer(&mut status));
        assert!(!remove_finalizer(&mut status));
        assert_eq!(state(&status), FinalizerState::Removed);
    }
}
