//! Structural policy rules

mod gate;
mod violations;

pub use gate::{GatePolicy, GateVerdict, PolicyGate};
pub use violations::PolicyViolation;
