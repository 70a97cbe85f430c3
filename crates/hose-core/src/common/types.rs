//! # Shared churn types and constants
//!
//! - [`Identifier`] - A generated resource name plus its sequence number
//! - [`Connectivity`] - Endpoint subsets copied from the source template
//! - [`ResourceKind`] - The two resource kinds churned as a pair
//! - [`StepBudget`] - How many steps each worker may take
//!
//! The generated Service always carries a single port, [`SERVICE_PORT`] over
//! [`SERVICE_PROTOCOL`]; only the Endpoints content comes from the template.

use core::fmt;
use k8s_openapi::api::core::v1::EndpointSubset;

/// Port exposed by every generated Service.
pub const SERVICE_PORT: i32 = 80;

/// Protocol of [`SERVICE_PORT`].
pub const SERVICE_PROTOCOL: &str = "TCP";

/// Connectivity data (address/port subsets) copied into every generated
/// Endpoints object.
pub type Connectivity = Vec<EndpointSubset>;

/// A unique resource name of the form `"{prefix}-{seq}"`.
///
/// Identifiers are ordered by `seq` so a single consumer can check that it
/// only ever observes increasing values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
    seq: u64,
}

impl Identifier {
    pub fn new(prefix: &str, seq: u64) -> Self {
        Self {
            name: format!("{prefix}-{seq}"),
            seq,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.seq
            .cmp(&other.seq)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// The two resource kinds created and deleted as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Service,
    Endpoints,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Service => write!(f, "Service"),
            ResourceKind::Endpoints => write!(f, "Endpoints"),
        }
    }
}

/// Per-worker step limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepBudget {
    /// Only cancellation ends the worker.
    Unbounded,
    /// The worker stops after this many steps.
    Limited(u64),
}

impl StepBudget {
    /// Returns `true` once `taken` steps use up the budget.
    pub const fn is_exhausted(&self, taken: u64) -> bool {
        match self {
            StepBudget::Unbounded => false,
            StepBudget::Limited(max) => taken >= *max,
        }
    }
}

impl From<i64> for StepBudget {
    /// Zero and negative counts mean "no limit".
    fn from(steps: i64) -> Self {
        if steps <= 0 {
            StepBudget::Unbounded
        } else {
            StepBudget::Limited(steps as u64)
        }
    }
}

impl fmt::Display for StepBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepBudget::Unbounded => write!(f, "unbounded"),
            StepBudget::Limited(max) => write!(f, "{max}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_formats_prefix_and_sequence() {
        let id = Identifier::new("hp", 7);
        assert_eq!(id.as_str(), "hp-7");
        assert_eq!(id.to_string(), "hp-7");
        assert_eq!(id.seq(), 7);
    }

    #[test]
    fn identifiers_order_numerically() {
        // "hp-10" < "hp-9" lexically, but not by sequence.
        assert!(Identifier::new("hp", 9) < Identifier::new("hp", 10));
    }

    #[test]
    fn non_positive_steps_are_unbounded() {
        assert_eq!(StepBudget::from(0), StepBudget::Unbounded);
        assert_eq!(StepBudget::from(-3), StepBudget::Unbounded);
        assert_eq!(StepBudget::from(4), StepBudget::Limited(4));
    }

    #[test]
    fn budget_exhaustion() {
        let budget = StepBudget::Limited(2);
        assert!(!budget.is_exhausted(1));
        assert!(budget.is_exhausted(2));
        assert!(!StepBudget::Unbounded.is_exhausted(u64::MAX));
    }
}
