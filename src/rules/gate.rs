//! Structural policy gate
//!
//! Every structural mutation (collapsing a node, inserting an interaction
//! under the root) asks the gate first. The gate is stateless: it holds a
//! policy record and evaluates each call fresh, so it is safe to call
//! speculatively.

use super::violations::PolicyViolation;
use crate::memory::Role;
use crate::{ArcError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Policy record consulted by [`PolicyGate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub allowed_roles: BTreeSet<Role>,
    pub min_cycle: i64,
    pub max_cycle: i64,
    pub max_children_per_node: usize,
    pub max_depth: usize,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            allowed_roles: [Role::User, Role::Ai, Role::System].into_iter().collect(),
            min_cycle: 0,
            max_cycle: 1_000_000,
            max_children_per_node: 20,
            max_depth: 40,
        }
    }
}

impl GatePolicy {
    /// Reject policies that could never allow anything sensible.
    pub fn validate(&self) -> Result<()> {
        if self.allowed_roles.is_empty() {
            return Err(ArcError::Config("policy allows no roles".to_string()));
        }
        if self.min_cycle > self.max_cycle {
            return Err(ArcError::Config(format!(
                "min_cycle {} is greater than max_cycle {}",
                self.min_cycle, self.max_cycle
            )));
        }
        Ok(())
    }
}

/// Outcome of a gate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Allowed,
    Blocked(PolicyViolation),
}

impl GateVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateVerdict::Allowed)
    }

    /// Rejection reason, `None` when allowed
    pub fn reason(&self) -> Option<String> {
        match self {
            GateVerdict::Allowed => None,
            GateVerdict::Blocked(v) => Some(v.reason()),
        }
    }

    /// `(allowed, reason)` pair
    pub fn into_pair(self) -> (bool, Option<String>) {
        let reason = self.reason();
        (self.is_allowed(), reason)
    }
}

/// Stateless gate over a fixed [`GatePolicy`]
#[derive(Debug, Clone, Default)]
pub struct PolicyGate {
    policy: GatePolicy,
}

impl PolicyGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Run role, cycle, fan-out and depth checks in that order.
    pub fn check(&self, role: &Role, cycle: i64, child_count: usize, depth: usize) -> GateVerdict {
        let policy = &self.policy;

        if !policy.allowed_roles.contains(role) {
            return GateVerdict::Blocked(PolicyViolation::InvalidRole { role: role.clone() });
        }
        if cycle < policy.min_cycle || cycle > policy.max_cycle {
            return GateVerdict::Blocked(PolicyViolation::CycleOutOfRange {
                cycle,
                min: policy.min_cycle,
                max: policy.max_cycle,
            });
        }
        if child_count > policy.max_children_per_node {
            return GateVerdict::Blocked(PolicyViolation::TooManyChildren {
                count: child_count,
                max: policy.max_children_per_node,
            });
        }
        if depth > policy.max_depth {
            return GateVerdict::Blocked(PolicyViolation::DepthExceeded {
                depth,
                max: policy.max_depth,
            });
        }

        GateVerdict::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_gate() -> PolicyGate {
        PolicyGate::new(GatePolicy {
            allowed_roles: [Role::User, Role::Ai].into_iter().collect(),
            min_cycle: 1,
            max_cycle: 10,
            max_children_per_node: 2,
            max_depth: 3,
        })
    }

    #[test]
    fn test_all_checks_pass() {
        let gate = tight_gate();
        let verdict = gate.check(&Role::User, 5, 2, 3);
        assert!(verdict.is_allowed());
        assert_eq!(verdict.into_pair(), (true, None));
    }

    #[test]
    fn test_each_check_rejects() {
        let gate = tight_gate();

        let v = gate.check(&Role::System, 5, 0, 0);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::InvalidRole { .. })));

        let v = gate.check(&Role::Ai, 0, 0, 0);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::CycleOutOfRange { .. })));

        let v = gate.check(&Role::Ai, 11, 0, 0);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::CycleOutOfRange { .. })));

        let v = gate.check(&Role::Ai, 5, 3, 0);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::TooManyChildren { .. })));

        let v = gate.check(&Role::Ai, 5, 0, 4);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::DepthExceeded { .. })));
    }

    #[test]
    fn test_first_failure_wins() {
        let gate = tight_gate();
        // Every check fails; the role check runs first.
        let v = gate.check(&Role::from("ghost"), 99, 99, 99);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::InvalidRole { .. })));

        // Role ok, everything else fails; cycle is next.
        let v = gate.check(&Role::User, 99, 99, 99);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::CycleOutOfRange { .. })));

        let v = gate.check(&Role::User, 5, 99, 99);
        assert!(matches!(v, GateVerdict::Blocked(PolicyViolation::TooManyChildren { .. })));
    }

    #[test]
    fn test_gate_is_repeatable() {
        let gate = tight_gate();
        let first = gate.check(&Role::User, 5, 3, 0);
        let second = gate.check(&Role::User, 5, 3, 0);
        assert_eq!(first, second);
        assert!(first.reason().unwrap().contains("Too many children"));
    }

    #[test]
    fn test_default_policy_matches_guardian_limits() {
        let gate = PolicyGate::default();
        assert!(gate.check(&Role::System, 1, 20, 40).is_allowed());
        assert!(!gate.check(&Role::System, 1, 21, 0).is_allowed());
        assert!(!gate.check(&Role::System, 1, 0, 41).is_allowed());
    }

    #[test]
    fn test_validate_rejects_empty_roles() {
        let policy = GatePolicy {
            allowed_roles: BTreeSet::new(),
            ..GatePolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(GatePolicy::default().validate().is_ok());
    }
}
