//! Policy violation types

use crate::memory::Role;

/// The check that rejected a gate call.
///
/// Checks run in declaration order; the first failure wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Role is not in the allowed set
    InvalidRole { role: Role },

    /// Cycle falls outside `[min_cycle, max_cycle]`
    CycleOutOfRange { cycle: i64, min: i64, max: i64 },

    /// Child count exceeds the fan-out ceiling
    TooManyChildren { count: usize, max: usize },

    /// Depth exceeds the depth ceiling
    DepthExceeded { depth: usize, max: usize },
}

impl PolicyViolation {
    /// Short machine-friendly tag of the failing check
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyViolation::InvalidRole { .. } => "INVALID_ROLE",
            PolicyViolation::CycleOutOfRange { .. } => "CYCLE_OUT_OF_RANGE",
            PolicyViolation::TooManyChildren { .. } => "TOO_MANY_CHILDREN",
            PolicyViolation::DepthExceeded { .. } => "DEPTH_EXCEEDED",
        }
    }

    /// Human-readable reason, embedded in blocked nodes
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyViolation::InvalidRole { role } => {
                write!(f, "Invalid role '{}'", role)
            }
            PolicyViolation::CycleOutOfRange { cycle, min, max } => {
                write!(f, "Cycle {} outside allowed range {}..={}", cycle, min, max)
            }
            PolicyViolation::TooManyChildren { count, max } => {
                write!(f, "Too many children ({} > {}), structural overload", count, max)
            }
            PolicyViolation::DepthExceeded { depth, max } => {
                write!(f, "Depth {} exceeds {}, recursion risk", depth, max)
            }
        }
    }
}
