//! Assertions on plans.

use crate::controller::{Action, Plan};

/// Expectation about the plan computed before an apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanCheck {
    ExpectEmptyPlan,
    ExpectNonEmptyPlan,
    ExpectResourceAction { address: String, action: Action },
}

impl PlanCheck {
    pub fn expect_empty() -> Self {
        Self::ExpectEmptyPlan
    }

    pub fn expect_non_empty() -> Self {
        Self::ExpectNonEmptyPlan
    }

    pub fn expect_action(address: impl Into<String>, action: Action) -> Self {
        Self::ExpectResourceAction {
            address: address.into(),
            action,
        }
    }

    pub fn check(&self, plan: &Plan) -> Result<(), String> {
        match self {
            Self::ExpectEmptyPlan if !plan.is_empty() => {
                Err(format!("expected an empty plan, got: {}", plan.describe()))
            }
            Self::ExpectNonEmptyPlan if plan.is_empty() => {
                Err("expected a non-empty plan".to_string())
            }
            Self::ExpectResourceAction { address, action } => match plan.action_for(address) {
                Some(actual) if actual == *action => Ok(()),
                Some(actual) => Err(format!("{address}: expected {action}, planned {actual}")),
                None => Err(format!("{address}: not in plan")),
            },
            _ => Ok(()),
        }
    }
}
