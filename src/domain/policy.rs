// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy Statements and Grants
//!
//! Statements only ever carry concrete ARNs (or patterns rendered from
//! concrete outputs). A [`Grant`] is the deferred request; it becomes a
//! [`PolicyStatement`] only once both principal and target materialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::LogicalId;

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Concrete permission statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    /// Principal ARN
    pub principal: String,
    pub actions: BTreeSet<String>,
    /// Resource ARNs or ARN patterns
    pub resources: BTreeSet<String>,
}

impl PolicyStatement {
    /// Allow statement for a principal over a set of resources
    pub fn allow<A, R>(principal: impl Into<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            principal: principal.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this statement already covers `other`
    pub fn covers(&self, other: &PolicyStatement) -> bool {
        self.effect == other.effect
            && self.principal == other.principal
            && self.resources == other.resources
            && other.actions.is_subset(&self.actions)
    }
}

/// Named policy attached to a single principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub principal: LogicalId,
    pub statements: Vec<PolicyStatement>,
}

impl Policy {
    /// Empty policy named after its principal
    pub fn for_principal(principal: LogicalId) -> Self {
        Self {
            name: format!("{}-policy", principal),
            principal,
            statements: Vec::new(),
        }
    }

    /// Merge a statement into the policy
    ///
    /// Statements with the same effect, principal and resources are folded
    /// into one. Returns `false` when the statement was already covered.
    pub fn merge(&mut self, statement: PolicyStatement) -> bool {
        if self.statements.iter().any(|s| s.covers(&statement)) {
            return false;
        }

        let existing = self.statements.iter_mut().find(|s| {
            s.effect == statement.effect
                && s.principal == statement.principal
                && s.resources == statement.resources
        });

        match existing {
            Some(s) => s.actions.extend(statement.actions),
            None => self.statements.push(statement),
        }
        true
    }
}

/// How a grant's resource element is rendered from the target's outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// The target's concrete `Arn` output
    Arn,
    /// Pattern with `{Attribute}` placeholders filled from the target's
    /// outputs, plus `{Region}` and `{AccountId}` from configuration
    Pattern(String),
}

/// Deferred least-privilege grant declared on a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub principal: LogicalId,
    pub target: LogicalId,
    pub actions: BTreeSet<String>,
    pub scope: GrantScope,
}
