// Copyright (c) 2025 - Cowboy AI, Inc.
//! Permission / Policy Attacher
//!
//! Turns deferred [`Grant`]s into concrete [`PolicyStatement`]s. A statement
//! is only rendered once both the principal and the target have
//! materialized, so it never holds a placeholder ARN.
//!
//! Attaching the same grant twice leaves the policy unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{attr, Grant, GrantScope, LogicalId, Policy, PolicyStatement};
use crate::errors::{StackError, StackResult};
use crate::outputs::OutputTable;
use crate::provider::Outputs;

/// Attaches least-privilege statements to principals' policies
#[derive(Debug)]
pub struct PolicyAttacher {
    outputs: Arc<OutputTable>,
    policies: Mutex<BTreeMap<LogicalId, Policy>>,
    region: String,
    account_id: String,
}

impl PolicyAttacher {
    pub fn new(
        outputs: Arc<OutputTable>,
        region: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            outputs,
            policies: Mutex::new(BTreeMap::new()),
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    /// Grant `actions` on `target`'s ARN to `principal`
    ///
    /// Waits until both resources are terminal. Returns `true` when the
    /// policy changed.
    pub async fn attach_least_privilege<A>(
        &self,
        principal: &LogicalId,
        target: &LogicalId,
        actions: A,
    ) -> StackResult<bool>
    where
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let grant = Grant {
            principal: principal.clone(),
            target: target.clone(),
            actions: actions.into_iter().map(Into::into).collect(),
            scope: GrantScope::Arn,
        };
        self.attach(&grant).await
    }

    /// Attach a declared grant
    pub async fn attach(&self, grant: &Grant) -> StackResult<bool> {
        let principal_outputs = self.materialized(&grant.principal).await?;
        let target_outputs = self.materialized(&grant.target).await?;

        let principal_arn = principal_outputs
            .get(attr::ARN)
            .ok_or_else(|| unresolved(&grant.principal, &grant.principal, attr::ARN))?;
        let resource = self.render_scope(grant, target_outputs)?;

        let statement = PolicyStatement::allow(
            principal_arn.clone(),
            grant.actions.iter().cloned(),
            [resource.clone()],
        );

        let mut policies = self.policies.lock().await;
        let changed = policies
            .entry(grant.principal.clone())
            .or_insert_with(|| Policy::for_principal(grant.principal.clone()))
            .merge(statement);

        if changed {
            info!(
                principal = %grant.principal,
                target = %grant.target,
                resource = %resource,
                actions = ?grant.actions,
                "Attached policy statement"
            );
        } else {
            debug!(principal = %grant.principal, target = %grant.target, "Grant already present");
        }
        Ok(changed)
    }

    /// Snapshot of every policy attached so far
    pub async fn policies(&self) -> Vec<Policy> {
        self.policies.lock().await.values().cloned().collect()
    }

    async fn materialized(&self, id: &LogicalId) -> StackResult<&Outputs> {
        let status = self.outputs.wait_terminal(id).await?;
        if !status.is_materialized() {
            return Err(StackError::PolicyTargetUnavailable(id.clone()));
        }
        self.outputs
            .outputs(id)
            .ok_or_else(|| StackError::PolicyTargetUnavailable(id.clone()))
    }

    fn render_scope(&self, grant: &Grant, target: &Outputs) -> StackResult<String> {
        match &grant.scope {
            GrantScope::Arn => target
                .get(attr::ARN)
                .cloned()
                .ok_or_else(|| unresolved(&grant.principal, &grant.target, attr::ARN)),
            GrantScope::Pattern(pattern) => self.render_pattern(grant, pattern, target),
        }
    }

    fn render_pattern(&self, grant: &Grant, pattern: &str, target: &Outputs) -> StackResult<String> {
        let mut rendered = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after
                .find('}')
                .ok_or_else(|| unresolved(&grant.principal, &grant.target, after))?;
            let name = &after[..end];

            let value = match name {
                "Region" => self.region.as_str(),
                "AccountId" => self.account_id.as_str(),
                attribute => target
                    .get(attribute)
                    .map(String::as_str)
                    .ok_or_else(|| unresolved(&grant.principal, &grant.target, attribute))?,
            };
            rendered.push_str(value);
            rest = &after[end + 1..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }
}

fn unresolved(owner: &LogicalId, target: &LogicalId, attribute: &str) -> StackError {
    StackError::UnresolvedDependency {
        resource: owner.clone(),
        target: target.clone(),
        attribute: attribute.to_string(),
    }
}
