//! `Ready` / `Synced` status conditions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// Whether the external resource is usable.
    Ready,
    /// Whether the last reconciliation pass succeeded.
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionReason {
    Available,
    Creating,
    Deleting,
    Unavailable,
    ReconcileSuccess,
    ReconcileError,
}

/// One condition entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: bool,
    pub reason: ConditionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_transition_time: OffsetDateTime,
}

impl Condition {
    fn new(condition_type: ConditionType, status: bool, reason: ConditionReason) -> Self {
        Self {
            condition_type,
            status,
            reason,
            message: None,
            last_transition_time: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn available() -> Self {
        Self::new(ConditionType::Ready, true, ConditionReason::Available)
    }

    #[must_use]
    pub fn creating() -> Self {
        Self::new(ConditionType::Ready, false, ConditionReason::Creating)
    }

    #[must_use]
    pub fn deleting() -> Self {
        Self::new(ConditionType::Ready, false, ConditionReason::Deleting)
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(ConditionType::Ready, false, ConditionReason::Unavailable)
    }

    #[must_use]
    pub fn reconcile_success() -> Self {
        Self::new(ConditionType::Synced, true, ConditionReason::ReconcileSuccess)
    }

    #[must_use]
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(ConditionType::Synced, false, ConditionReason::ReconcileError)
        }
    }

    /// Same condition, ignoring the transition time.
    fn equivalent(&self, other: &Self) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Conditions keyed by type; at most one entry per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    /// Sets a condition. An equivalent existing entry is left untouched so
    /// its transition time does not move.
    pub fn set(&mut self, condition: Condition) {
        match self
            .0
            .iter_mut()
            .find(|existing| existing.condition_type == condition.condition_type)
        {
            Some(existing) if existing.equivalent(&condition) => {}
            Some(existing) => *existing = condition,
            None => self.0.push(condition),
        }
    }

    #[must_use]
    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.0.iter().find(|c| c.condition_type == condition_type)
    }

    /// Returns `true` if the `Ready` condition is true.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.get(ConditionType::Ready).is_some_and(|c| c.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_condition_keeps_transition_time() {
        let mut conditions = Conditions::default();
        let mut first = Condition::available();
        first.last_transition_time = OffsetDateTime::UNIX_EPOCH;
        conditions.set(first);
        conditions.set(Condition::available());

        let ready = conditions.get(ConditionType::Ready).unwrap();
        assert_eq!(ready.last_transition_time, OffsetDateTime::UNIX_EPOCH);
        assert!(conditions.is_ready());
    }

    #[test]
    fn test_changed_condition_replaces_entry() {
        let mut conditions = Conditions::default();
        conditions.set(Condition::available());
        conditions.set(Condition::deleting());
        conditions.set(Condition::reconcile_error("boom"));

        assert_eq!(conditions.iter().count(), 2);
        assert_eq!(
            conditions.get(ConditionType::Ready).unwrap().reason,
            ConditionReason::Deleting
        );
        assert_eq!(
            conditions.get(ConditionType::Synced).unwrap().message.as_deref(),
            Some("boom")
        );
        assert!(!conditions.is_ready());
    }
}
