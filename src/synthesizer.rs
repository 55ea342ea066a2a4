// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Synthesizer
//!
//! Walks the dependency graph and materializes every resource against its
//! provider.
//!
//! # Execution Model
//!
//! ```text
//! build graph ─> check providers ─> seal ─> spawn one task per resource
//!                                              │
//!            wait for dependencies (watch) <───┘
//!            acquire permit (semaphore)
//!            resolve references ─> Provider::create (retry + timeout)
//!            record outputs ─> Materialized | Failed | Skipped
//! ```
//!
//! Construction errors (duplicate ids, unknown references, cycles, missing
//! providers) are raised before any provider call. Provider failures are
//! contained: the failing resource is `Failed`, everything downstream is
//! `Skipped`, independent branches keep going.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::{FailedGrant, ResourceRecord, SynthesizedStack};
use crate::config::{RetryConfig, SynthesizerConfig, Tags};
use crate::domain::{LogicalId, Properties, ResourceKind};
use crate::errors::{StackError, StackResult, SynthesisError};
use crate::graph::DependencyGraph;
use crate::outputs::OutputTable;
use crate::policy::PolicyAttacher;
use crate::provider::{CreateRequest, Provider, ProviderError, ProviderRegistry};
use crate::resolver::{self, ResolvedProperties};
use crate::retry::with_retry;
use crate::stack::Stack;
use crate::state_machine::{LifecycleEvent, ResourceStatus};

/// Drives synthesis of stacks against registered providers
#[derive(Debug)]
pub struct Synthesizer {
    config: SynthesizerConfig,
    providers: ProviderRegistry,
    cancel: CancellationToken,
}

/// Everything one resource task needs
struct Job {
    id: LogicalId,
    kind: ResourceKind,
    properties: Properties,
    tags: Tags,
    dependencies: Vec<LogicalId>,
    provider: Arc<dyn Provider>,
}

/// State shared by all tasks of one run
struct RunContext {
    table: Arc<OutputTable>,
    permits: Semaphore,
    cancel: CancellationToken,
    retry: RetryConfig,
    timeout: Duration,
}

/// What a task reports besides the status held in the output table
#[derive(Debug, Default)]
struct TaskReport {
    resolved: Option<ResolvedProperties>,
    error: Option<String>,
}

impl TaskReport {
    fn error(message: impl Into<String>) -> Self {
        Self {
            resolved: None,
            error: Some(message.into()),
        }
    }
}

impl Synthesizer {
    /// Create a synthesizer; the configuration is validated here
    pub fn new(config: SynthesizerConfig, providers: ProviderRegistry) -> StackResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            providers,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels every run of this synthesizer
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    pub(crate) fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Synthesize a stack
    ///
    /// Materializes every resource in dependency order. The stack is sealed
    /// once its graph and providers check out; a construction error leaves
    /// it open for correction. Returns the artifact when every resource
    /// materialized, or `StackError::Synthesis` carrying the full artifact
    /// otherwise.
    pub async fn synthesize(&self, stack: &mut Stack) -> StackResult<SynthesizedStack> {
        let graph = DependencyGraph::build(stack.resources())?;
        let order: Vec<LogicalId> = graph.topological_order().into_iter().cloned().collect();

        let mut providers: HashMap<LogicalId, Arc<dyn Provider>> = HashMap::new();
        for resource in stack.resources() {
            providers.insert(resource.id.clone(), self.providers.get(resource.kind)?);
        }
        stack.seal();

        let run_id = Uuid::now_v7();
        info!(
            stack = %stack.name(),
            run_id = %run_id,
            resources = order.len(),
            grants = stack.grants().len(),
            "Starting synthesis"
        );

        let base_tags = self.config.default_tags();
        let table = Arc::new(OutputTable::new(&order));
        let run_cancel = self.cancel.child_token();
        let ctx = Arc::new(RunContext {
            table: Arc::clone(&table),
            permits: Semaphore::new(self.config.max_parallelism),
            cancel: run_cancel.clone(),
            retry: self.config.retry.clone(),
            timeout: self.config.create_timeout,
        });

        let mut tasks = JoinSet::new();
        for id in &order {
            let Some(resource) = stack.registry().get(id) else {
                return Err(StackError::UnknownResource(id.to_string()));
            };
            let Some(provider) = providers.get(id) else {
                return Err(StackError::NoProvider(resource.kind));
            };
            let job = Job {
                id: id.clone(),
                kind: resource.kind,
                properties: resource.properties.clone(),
                tags: stack.tags_for(resource, &base_tags),
                dependencies: graph.dependencies(id).into_iter().cloned().collect(),
                provider: Arc::clone(provider),
            };
            let ctx = Arc::clone(&ctx);
            tasks.spawn(run_job(job, ctx));
        }

        let attacher = Arc::new(PolicyAttacher::new(
            Arc::clone(&table),
            self.config.region.clone(),
            self.config.account_id.clone(),
        ));
        let mut grant_tasks = JoinSet::new();
        for grant in stack.grants() {
            let attacher = Arc::clone(&attacher);
            let grant = grant.clone();
            grant_tasks.spawn(async move {
                let result = attacher.attach(&grant).await;
                (grant, result)
            });
        }

        let mut reports: HashMap<LogicalId, TaskReport> = HashMap::new();
        let mut fatal: Option<StackError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(report))) => {
                    reports.insert(id, report);
                }
                Ok((id, Err(err))) => {
                    error!(resource = %id, error = %err, "Synthesis aborted");
                    run_cancel.cancel();
                    reports.insert(id, TaskReport::error(err.to_string()));
                    fatal.get_or_insert(err);
                }
                Err(join_err) => {
                    run_cancel.cancel();
                    fatal.get_or_insert(StackError::Internal(join_err.to_string()));
                }
            }
        }

        let mut failed_grants: Vec<FailedGrant> = Vec::new();
        while let Some(joined) = grant_tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => {}
                Ok((grant, Err(err))) => {
                    warn!(
                        principal = %grant.principal,
                        target = %grant.target,
                        error = %err,
                        "Grant not attached"
                    );
                    failed_grants.push(FailedGrant {
                        principal: grant.principal,
                        target: grant.target,
                        actions: grant.actions,
                        error: err.to_string(),
                    });
                }
                Err(join_err) => warn!(error = %join_err, "Grant task failed"),
            }
        }
        failed_grants.sort_by(|a, b| (&a.principal, &a.target).cmp(&(&b.principal, &b.target)));

        if let Some(err) = fatal {
            return Err(err);
        }

        let mut artifact = self
            .assemble(stack, run_id, &order, &table, &mut reports, &base_tags, &attacher)
            .await?;
        artifact.failed_grants = failed_grants;
        self.conclude(artifact)
    }

    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        stack: &Stack,
        run_id: Uuid,
        order: &[LogicalId],
        table: &OutputTable,
        reports: &mut HashMap<LogicalId, TaskReport>,
        base_tags: &Tags,
        attacher: &PolicyAttacher,
    ) -> StackResult<SynthesizedStack> {
        let mut records = Vec::with_capacity(order.len());
        for id in order {
            let resource = stack
                .registry()
                .get(id)
                .ok_or_else(|| StackError::UnknownResource(id.to_string()))?;
            let report = reports.remove(id).unwrap_or_default();
            records.push(ResourceRecord {
                resource_id: id.clone(),
                kind: resource.kind,
                resolved_properties: report.resolved,
                tags: stack.tags_for(resource, base_tags),
                outputs: table.outputs(id).cloned().unwrap_or_default(),
                status: table.status(id)?,
                error: report.error,
            });
        }

        let materialized = table.snapshot_of(order);
        let mut outputs = std::collections::BTreeMap::new();
        for (name, reference) in stack.outputs() {
            match resolver::resolve(&reference.resource, reference, &materialized) {
                Ok(value) => {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    outputs.insert(name.clone(), value);
                }
                Err(_) => debug!(output = %name, reference = %reference, "Stack output unavailable"),
            }
        }

        Ok(SynthesizedStack {
            stack: stack.name().to_string(),
            run_id,
            synthesized_at: chrono::Utc::now(),
            records,
            outputs,
            policies: attacher.policies().await,
            failed_grants: Vec::new(),
        })
    }

    fn conclude(&self, artifact: SynthesizedStack) -> StackResult<SynthesizedStack> {
        let failed: Vec<(LogicalId, String)> = artifact
            .records
            .iter()
            .filter(|r| r.status == ResourceStatus::Failed)
            .map(|r| (r.resource_id.clone(), r.error.clone().unwrap_or_default()))
            .collect();
        let skipped: Vec<LogicalId> = artifact
            .records
            .iter()
            .filter(|r| r.status == ResourceStatus::Skipped)
            .map(|r| r.resource_id.clone())
            .collect();

        if failed.is_empty() && skipped.is_empty() {
            info!(
                stack = %artifact.stack,
                run_id = %artifact.run_id,
                resources = artifact.records.len(),
                policies = artifact.policies.len(),
                "Synthesis complete"
            );
            return Ok(artifact);
        }

        warn!(
            stack = %artifact.stack,
            run_id = %artifact.run_id,
            failed = failed.len(),
            skipped = skipped.len(),
            "Synthesis incomplete"
        );
        Err(SynthesisError {
            report: artifact,
            failed,
            skipped,
        }
        .into())
    }
}

/// Run one resource task
///
/// Whatever happens inside, the resource ends in a terminal status so that
/// dependents and grants waiting on it are released.
async fn run_job(job: Job, ctx: Arc<RunContext>) -> (LogicalId, StackResult<TaskReport>) {
    let id = job.id.clone();
    let table = Arc::clone(&ctx.table);
    let outcome = AssertUnwindSafe(materialize(job, ctx)).catch_unwind().await;

    match outcome {
        Ok(Ok(report)) => (id, Ok(report)),
        Ok(Err(err)) => {
            if let Err(forced) = force_fail(&table, &id) {
                error!(resource = %id, error = %forced, "Cannot mark resource failed");
            }
            (id, Err(err))
        }
        Err(_) => {
            error!(resource = %id, "Resource task panicked");
            let forced = force_fail(&table, &id).map(|_| TaskReport::error("resource task panicked"));
            (id, forced)
        }
    }
}

fn force_fail(table: &OutputTable, id: &LogicalId) -> StackResult<()> {
    if table.status(id)? == ResourceStatus::Pending {
        table.transition(id, LifecycleEvent::Begin)?;
    }
    if table.status(id)? == ResourceStatus::Materializing {
        table.transition(id, LifecycleEvent::Fail)?;
    }
    Ok(())
}

async fn materialize(job: Job, ctx: Arc<RunContext>) -> StackResult<TaskReport> {
    let table = &ctx.table;

    for dep in &job.dependencies {
        let status = table.wait_terminal(dep).await?;
        if !status.is_materialized() {
            debug!(resource = %job.id, dependency = %dep, status = %status, "Skipping resource");
            table.transition(&job.id, LifecycleEvent::Skip)?;
            return Ok(TaskReport::error(format!("dependency {} is {}", dep, status)));
        }
    }

    let _permit = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            table.transition(&job.id, LifecycleEvent::Skip)?;
            return Ok(TaskReport::error("synthesis cancelled"));
        }
        permit = ctx.permits.acquire() => permit
            .map_err(|_| StackError::Internal("permit pool closed".into()))?,
    };
    if ctx.cancel.is_cancelled() {
        table.transition(&job.id, LifecycleEvent::Skip)?;
        return Ok(TaskReport::error("synthesis cancelled"));
    }

    table.transition(&job.id, LifecycleEvent::Begin)?;
    debug!(resource = %job.id, kind = %job.kind, "Materializing resource");

    let materialized = table.snapshot_of(&job.dependencies);
    let resolved = match resolver::resolve_properties(&job.id, &job.properties, &materialized) {
        Ok(resolved) => resolved,
        Err(err) => {
            table.transition(&job.id, LifecycleEvent::Fail)?;
            return Err(err);
        }
    };

    let request = CreateRequest {
        id: &job.id,
        kind: job.kind,
        properties: &resolved,
        tags: &job.tags,
    };
    let result = with_retry(&ctx.retry, ctx.timeout, &ctx.cancel, &job.id, || {
        job.provider.create(&request)
    })
    .await;

    let mut report = TaskReport {
        resolved: Some(resolved.clone()),
        error: None,
    };
    match result {
        Ok(outputs) if ctx.cancel.is_cancelled() => {
            table.skip_with_outputs(&job.id, outputs)?;
            report.error = Some("synthesis cancelled while creating".into());
        }
        Ok(outputs) => {
            info!(resource = %job.id, kind = %job.kind, "Resource materialized");
            table.materialize(&job.id, outputs)?;
        }
        Err(ProviderError::Cancelled) => {
            table.transition(&job.id, LifecycleEvent::Skip)?;
            report.error = Some("synthesis cancelled".into());
        }
        Err(source) if ctx.cancel.is_cancelled() => {
            debug!(resource = %job.id, error = %source, "Attempt ended after cancellation");
            table.transition(&job.id, LifecycleEvent::Skip)?;
            report.error = Some("synthesis cancelled".into());
        }
        Err(source) => {
            let err = StackError::ProviderCreation {
                resource: job.id.clone(),
                source,
            };
            warn!(resource = %job.id, kind = %job.kind, error = %err, "Resource failed");
            table.transition(&job.id, LifecycleEvent::Fail)?;
            report.error = Some(err.to_string());
        }
    }
    Ok(report)
}
