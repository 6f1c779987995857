//! The scheduler: turns a [`Workflow`] graph into dispatch rounds of
//! concurrently-running node executions.
//!
//! Flow-control node types (`if`, `switch`, `merge`, `loop`, `parallel`,
//! `retry`, `rateLimit`, `tryCatch`) are interpreted natively by
//! [`WorkflowEngine::run_flow_node`] rather than dispatched through the
//! [`ExecutorRegistry`] — the registry only ever sees a node's own
//! business-logic type (`http.request`, `code`, `set`, …).
//!
//! Grounded on the teacher's `WorkflowEngine::execute_workflow` /
//! `run_levels` / `spawn_level`: a level-by-level `JoinSet` bounded by a
//! `Semaphore`, generalized here from static parallel groups into a live
//! handle-aware dispatch queue recomputed every round.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use nervemind_core::{ConnectionId, ExecutionId, HandleKey, NodeId};
use nervemind_credential::CredentialVault;
use nervemind_execution::{ExecutionContext, ExecutionError, ExecutionStatus};
use nervemind_executor::{ExecutorContext, ExecutorError, ExecutorInput, ExecutorRegistry, ExecutorSignal, SecureString};
use nervemind_expression::resolver::{EvaluationContext, SecretSink, VariableResolver};
use nervemind_expression::template::Template;
use nervemind_log::ExecutionLogger;
use nervemind_resilience::{BackoffKind, RetryPolicy, TokenBucket};
use nervemind_workflow::model::{Node, TriggerKind, Workflow};
use nervemind_workflow::validate;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::params::{
    CompareOp, IfParams, LoopParams, MergeMode, MergeParams, ParallelParams, RateLimitMode, RateLimitParams,
    RetryParams, SwitchParams, TryCatchParams,
};
use crate::result::{ExecutionOutcome, FailureInfo};
use crate::settings::EngineSettings;

const FLOW_CONTROL_TYPES: &[&str] = &["if", "switch", "merge", "loop", "parallel", "retry", "tryCatch", "rateLimit"];

/// A value in flight along one connection, queued for the next round.
#[derive(Debug, Clone)]
struct Delivery {
    connection_id: ConnectionId,
    to_node: NodeId,
    to_handle: HandleKey,
    value: Value,
}

/// In-flight or completed state of a run started through
/// [`WorkflowEngine::execute_detached`].
enum RunState {
    Running { cancellation: CancellationToken },
    Done(Arc<Result<ExecutionOutcome, EngineError>>),
}

/// What [`WorkflowEngine::poll`] reports for a detached run.
#[derive(Debug, Clone)]
pub enum ExecutionPoll {
    /// Still executing.
    Running,
    /// Finished, successfully or not — the same `Result` `executeSync`
    /// would have returned.
    Finished(Arc<Result<ExecutionOutcome, EngineError>>),
}

/// The handle-aware scheduler for one [`Workflow`].
///
/// Stateless across synchronous calls — all per-run state lives inside one
/// [`WorkflowEngine::execute`] invocation, so a single instance is shared
/// across concurrently running executions. The one piece of state the
/// engine itself owns is the completion registry for runs started with
/// [`WorkflowEngine::execute_detached`] (spec.md §6's fire-and-forget
/// `execute`), which a later `poll`/`cancel` call needs to find by id.
pub struct WorkflowEngine {
    executors: Arc<ExecutorRegistry>,
    vault: Option<Arc<dyn CredentialVault>>,
    settings: EngineSettings,
    runs: parking_lot::RwLock<HashMap<ExecutionId, RunState>>,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(executors: Arc<ExecutorRegistry>, vault: Option<Arc<dyn CredentialVault>>, settings: EngineSettings) -> Self {
        Self { executors, vault, settings, runs: parking_lot::RwLock::new(HashMap::new()) }
    }

    /// Run `workflow` from whichever entry node matches `trigger`, seeded
    /// with `input` as that node's output, blocking until it finishes or
    /// times out. This is spec.md §6's `executeSync`.
    pub async fn execute(&self, workflow: &Workflow, trigger: TriggerKind, input: Value) -> Result<ExecutionOutcome, EngineError> {
        self.execute_with(workflow, trigger, input, ExecutionId::v4(), CancellationToken::new()).await
    }

    /// Starts `workflow` on a background task and returns its id
    /// immediately — spec.md §6's fire-and-forget `execute`. Poll for
    /// completion with [`Self::poll`]; cancel early with [`Self::cancel`].
    ///
    /// Requires an `Arc<WorkflowEngine>` since the background task outlives
    /// this call.
    pub fn execute_detached(self: &Arc<Self>, workflow: Arc<Workflow>, trigger: TriggerKind, input: Value) -> ExecutionId {
        let execution_id = ExecutionId::v4();
        let cancellation = CancellationToken::new();
        self.runs.write().insert(execution_id, RunState::Running { cancellation: cancellation.clone() });

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let result = engine.execute_with(&workflow, trigger, input, execution_id, cancellation).await;
            engine.runs.write().insert(execution_id, RunState::Done(Arc::new(result)));
        });

        execution_id
    }

    /// Status of a run started with [`Self::execute_detached`]. `None` if
    /// `execution_id` is unknown to this engine instance.
    #[must_use]
    pub fn poll(&self, execution_id: ExecutionId) -> Option<ExecutionPoll> {
        match self.runs.read().get(&execution_id)? {
            RunState::Running { .. } => Some(ExecutionPoll::Running),
            RunState::Done(result) => Some(ExecutionPoll::Finished(Arc::clone(result))),
        }
    }

    /// Requests early cancellation of a detached run. Returns `false` if
    /// `execution_id` is unknown or already finished — cooperative
    /// cancellation still has to be observed by the run's next
    /// `ctx.check_cancelled()` call, the same as the synchronous path.
    pub fn cancel(&self, execution_id: ExecutionId) -> bool {
        match self.runs.read().get(&execution_id) {
            Some(RunState::Running { cancellation }) => {
                cancellation.cancel();
                true
            }
            _ => false,
        }
    }

    async fn execute_with(
        &self,
        workflow: &Workflow,
        trigger: TriggerKind,
        input: Value,
        execution_id: ExecutionId,
        cancellation: CancellationToken,
    ) -> Result<ExecutionOutcome, EngineError> {
        validate::validate(workflow, &self.executors.looping_capable())?;
        self.check_registrations(workflow)?;

        let entry = workflow
            .entry_nodes()
            .find(|n| n.trigger.as_ref().is_some_and(|t| trigger_matches(t, &trigger)))
            .ok_or(EngineError::NoMatchingTrigger)?
            .clone();

        let ctx = ExecutionContext::new(execution_id, workflow.id).with_cancellation(cancellation);
        let logger = ExecutionLogger::new(execution_id);
        logger.execution_started();

        let started = Instant::now();
        let run = tokio::time::timeout(self.settings.default_timeout, self.run_rounds(workflow, &ctx, &logger, &entry, input));

        let (status, failure) = match run.await {
            Err(_elapsed) => {
                ctx.cancellation.cancel();
                logger.cancelled();
                (
                    ExecutionStatus::Failed,
                    Some(FailureInfo { node_id: entry.id.clone(), message: "workflow execution timed out".to_string() }),
                )
            }
            Ok(Ok(())) => (ExecutionStatus::Success, None),
            Ok(Err(EngineError::NodeFailed { node_id, source })) => {
                (ExecutionStatus::Failed, Some(FailureInfo { node_id, message: source.to_string() }))
            }
            Ok(Err(EngineError::Execution(ExecutionError::Cancelled))) => (ExecutionStatus::Cancelled, None),
            Ok(Err(other)) => return Err(other),
        };

        logger.execution_finished(&status.to_string());

        Ok(ExecutionOutcome {
            execution_id,
            status,
            node_outputs: ctx.node_outputs.read().clone(),
            duration: started.elapsed(),
            failure,
        })
    }

    /// Every non-trigger, non-flow-control node must name a registered
    /// executor type before the run starts — a missing registration is a
    /// deployment defect, not a runtime outcome.
    fn check_registrations(&self, workflow: &Workflow) -> Result<(), EngineError> {
        for node in &workflow.nodes {
            if node.disabled || node.is_trigger() || FLOW_CONTROL_TYPES.contains(&node.node_type.as_str()) {
                continue;
            }
            if !self.executors.contains(&node.node_type) {
                return Err(EngineError::UnregisteredType(node.node_type.clone()));
            }
        }
        Ok(())
    }

    async fn run_rounds(
        &self,
        workflow: &Workflow,
        ctx: &ExecutionContext,
        logger: &ExecutionLogger,
        entry: &Node,
        input: Value,
    ) -> Result<(), EngineError> {
        let mut fired: HashSet<NodeId> = HashSet::new();
        let mut dead_connections: HashSet<ConnectionId> = HashSet::new();
        let mut merge_pending: HashMap<NodeId, HashMap<ConnectionId, Value>> = HashMap::new();
        let mut rate_limiters: HashMap<NodeId, Arc<TokenBucket>> = HashMap::new();
        let mut queue: VecDeque<Delivery> = VecDeque::new();

        logger.node_started(entry.id.clone());
        fired.insert(entry.id.clone());
        let mut entry_out = HashMap::new();
        entry_out.insert(HandleKey::default_handle(), input);
        let mut initial = Vec::new();
        apply_output(workflow, ctx, &mut initial, &mut dead_connections, &entry.id, entry_out);
        logger.node_completed(entry.id.clone());
        queue.extend(initial);

        while !queue.is_empty() {
            ctx.check_cancelled()?;

            let mut round_inputs: HashMap<NodeId, HashMap<HandleKey, Value>> = HashMap::new();

            while let Some(delivery) = queue.pop_front() {
                let node = workflow.node(&delivery.to_node).ok_or_else(|| EngineError::NodeNotFound(delivery.to_node.clone()))?;

                if node.node_type == "merge" {
                    let params = MergeParams::decode(&node.id, &node.parameters)?;
                    if params.wait_for_all {
                        if fired.contains(&node.id) {
                            logger.branch_dropped(
                                node.id.clone(),
                                format!("merge already fired, dropping late arrival on {}", delivery.connection_id),
                            );
                            continue;
                        }
                        merge_pending.entry(node.id.clone()).or_default().insert(delivery.connection_id, delivery.value);
                        let live = workflow.connections_to(&node.id).filter(|c| !dead_connections.contains(&c.id)).count();
                        let arrived = merge_pending.get(&node.id).map_or(0, HashMap::len);
                        if arrived < live {
                            continue;
                        }
                        let mut pending = merge_pending.remove(&node.id).unwrap_or_default();
                        let merged = merge_values(workflow, &node.id, params.mode, &mut pending);
                        fired.insert(node.id.clone());
                        round_inputs.entry(node.id.clone()).or_default().insert(HandleKey::default_handle(), merged);
                        continue;
                    }
                }

                if fired.contains(&node.id) {
                    logger.branch_dropped(
                        node.id.clone(),
                        format!("node already fired, dropping late arrival on {}", delivery.connection_id),
                    );
                    continue;
                }
                fired.insert(node.id.clone());
                round_inputs.entry(node.id.clone()).or_default().insert(delivery.to_handle, delivery.value);
            }

            if round_inputs.is_empty() {
                break;
            }

            let mut deliveries: Vec<Delivery> = Vec::new();
            let mut registry_tasks: JoinSet<(NodeId, Result<HashMap<HandleKey, Value>, ExecutorError>)> = JoinSet::new();
            let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel.max(1)));

            for (node_id, inputs) in round_inputs {
                let node = workflow.node(&node_id).ok_or_else(|| EngineError::NodeNotFound(node_id.clone()))?.clone();

                if node.disabled {
                    logger.node_skipped(node.id.clone(), "disabled");
                    ctx.record_mut(&node.id, |r| r.skip());
                    let value = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);
                    let mut outputs = HashMap::new();
                    outputs.insert(HandleKey::default_handle(), value);
                    apply_output(workflow, ctx, &mut deliveries, &mut dead_connections, &node.id, outputs);
                    continue;
                }

                if FLOW_CONTROL_TYPES.contains(&node.node_type.as_str()) {
                    let outputs = self.run_flow_node(workflow, &node, inputs, ctx, logger, &mut rate_limiters).await?;
                    apply_output(workflow, ctx, &mut deliveries, &mut dead_connections, &node.id, outputs);
                    continue;
                }

                let item = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);
                let rendered_params = render_node_params(workflow, ctx, self.vault.as_deref(), logger, &item, &node.parameters)
                    .await
                    .map_err(|source| EngineError::NodeFailed { node_id: node.id.clone(), source })?;

                let permit = semaphore.clone();
                let executors = self.executors.clone();
                let vault = self.vault.clone();
                let ctx_clone = ctx.clone();
                let logger_clone = logger.clone();
                let default_timeout = self.settings.default_timeout;
                registry_tasks.spawn(async move {
                    let _permit = permit.acquire_owned().await.expect("semaphore is never closed");
                    let result = dispatch_registry_node(
                        &executors,
                        vault.as_deref(),
                        &node,
                        rendered_params,
                        inputs,
                        &ctx_clone,
                        &logger_clone,
                        default_timeout,
                    )
                    .await;
                    (node.id, result)
                });
            }

            while let Some(joined) = registry_tasks.join_next().await {
                let (node_id, result) = joined.expect("registry node task panicked");
                match result {
                    Ok(outputs) => apply_output(workflow, ctx, &mut deliveries, &mut dead_connections, &node_id, outputs),
                    Err(source) => return Err(EngineError::NodeFailed { node_id, source }),
                }
            }

            queue.extend(deliveries);
        }

        mark_excluded_nodes_skipped(workflow, ctx, &fired);

        Ok(())
    }

    /// Interprets one flow-control node inline, returning its activated
    /// output handles.
    async fn run_flow_node(
        &self,
        workflow: &Workflow,
        node: &Node,
        inputs: HashMap<HandleKey, Value>,
        ctx: &ExecutionContext,
        logger: &ExecutionLogger,
        rate_limiters: &mut HashMap<NodeId, Arc<TokenBucket>>,
    ) -> Result<HashMap<HandleKey, Value>, EngineError> {
        let item = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);

        match node.node_type.as_str() {
            "if" => {
                let params = IfParams::decode(&node.id, &node.parameters)?;
                let resolver = EngineVariableResolver { exec_ctx: ctx, workflow };
                let secret_sink = LoggerSecretSink(logger);
                let eval_ctx = EvaluationContext::new(self.vault.as_deref(), &resolver, &item).with_secret_sink(&secret_sink);
                let left = render_template(&node.id, "if", &params.left, &eval_ctx).await?;
                let right = render_template(&node.id, "if", &params.right, &eval_ctx).await?;
                let matched = compare(&left, &right, params.operator);
                let mut out = HashMap::new();
                out.insert(HandleKey::new(if matched { "true" } else { "false" }), item);
                Ok(out)
            }
            "switch" => {
                let params = SwitchParams::decode(&node.id, &node.parameters)?;
                let resolver = EngineVariableResolver { exec_ctx: ctx, workflow };
                let secret_sink = LoggerSecretSink(logger);
                let eval_ctx = EvaluationContext::new(self.vault.as_deref(), &resolver, &item).with_secret_sink(&secret_sink);
                let discriminator = render_template(&node.id, "switch", &params.discriminator, &eval_ctx).await?;
                let handle = match params.cases.iter().position(|c| c == &discriminator) {
                    Some(i) => HandleKey::new(format!("case{i}")),
                    None => HandleKey::default_handle(),
                };
                let mut out = HashMap::new();
                out.insert(handle, item);
                Ok(out)
            }
            "merge" => {
                // Gating (wait-any first-arrival, or wait-all accumulation
                // and mode combination) already happened in `run_rounds`;
                // `item` is the already-resolved value to pass downstream.
                let mut out = HashMap::new();
                out.insert(HandleKey::default_handle(), item);
                Ok(out)
            }
            "parallel" => {
                let params = ParallelParams::decode(&node.id, &node.parameters)?;
                let mut out = HashMap::new();
                for branch in &params.branches {
                    out.insert(HandleKey::new(branch.clone()), item.clone());
                }
                Ok(out)
            }
            "rateLimit" => {
                let params = RateLimitParams::decode(&node.id, &node.parameters)?;
                let bucket = rate_limiters
                    .entry(node.id.clone())
                    .or_insert_with(|| Arc::new(TokenBucket::new(1.0, params.requests_per_second.max(0.001))))
                    .clone();
                loop {
                    match bucket.try_acquire() {
                        Ok(()) => {
                            let mut out = HashMap::new();
                            out.insert(HandleKey::default_handle(), item);
                            return Ok(out);
                        }
                        Err(wait) => match params.mode {
                            RateLimitMode::Reject => {
                                logger.rate_limited(node.id.clone(), format!("rejected, capacity back in {wait:?}"));
                                return Err(EngineError::NodeFailed {
                                    node_id: node.id.clone(),
                                    source: ExecutorError::rate_limited(wait),
                                });
                            }
                            RateLimitMode::Queue | RateLimitMode::Delay => {
                                logger.rate_limited(node.id.clone(), format!("delaying {wait:?}"));
                                ctx.check_cancelled()?;
                                tokio::time::sleep(wait).await;
                            }
                        },
                    }
                }
            }
            "retry" => {
                let params = RetryParams::decode(&node.id, &node.parameters)?;
                let body_node = workflow.node(&params.body).ok_or_else(|| EngineError::NodeNotFound(params.body.clone()))?.clone();
                if !self.executors.contains(&body_node.node_type) {
                    return Err(EngineError::UnregisteredType(body_node.node_type.clone()));
                }
                let policy = RetryPolicy {
                    max_attempts: params.max_attempts.unwrap_or(self.settings.default_retry_attempts),
                    initial_delay: Duration::from_millis(
                        params.initial_delay_ms.unwrap_or(self.settings.default_retry_delay.as_millis() as u64),
                    ),
                    max_delay: Duration::from_secs(30),
                    multiplier: params.multiplier.unwrap_or(2.0),
                    kind: BackoffKind::Exponential,
                    jitter: true,
                };

                let body_item = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);
                let body_params = render_node_params(workflow, ctx, self.vault.as_deref(), logger, &body_item, &body_node.parameters)
                    .await
                    .map_err(|source| EngineError::NodeFailed { node_id: body_node.id.clone(), source })?;

                let mut attempt = 0u32;
                loop {
                    attempt += 1;
                    let result = dispatch_registry_node(
                        &self.executors,
                        self.vault.as_deref(),
                        &body_node,
                        body_params.clone(),
                        inputs.clone(),
                        ctx,
                        logger,
                        self.settings.default_timeout,
                    )
                    .await;
                    match result {
                        Ok(outputs) => return Ok(outputs),
                        Err(error) if error.is_retryable() && policy.should_retry(attempt) => {
                            let delay = policy.delay_for(attempt);
                            logger.node_retrying(node.id.clone(), attempt, delay.as_millis() as u64);
                            ctx.check_cancelled()?;
                            tokio::time::sleep(delay).await;
                        }
                        Err(error) => return Err(EngineError::NodeFailed { node_id: body_node.id, source: error }),
                    }
                }
            }
            "tryCatch" => {
                let params = TryCatchParams::decode(&node.id, &node.parameters)?;
                let try_node = workflow.node(&params.r#try).ok_or_else(|| EngineError::NodeNotFound(params.r#try.clone()))?.clone();
                if !self.executors.contains(&try_node.node_type) {
                    return Err(EngineError::UnregisteredType(try_node.node_type.clone()));
                }
                let try_item = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);
                let try_params = render_node_params(workflow, ctx, self.vault.as_deref(), logger, &try_item, &try_node.parameters)
                    .await
                    .map_err(|source| EngineError::NodeFailed { node_id: try_node.id.clone(), source })?;
                let result = dispatch_registry_node(
                    &self.executors,
                    self.vault.as_deref(),
                    &try_node,
                    try_params,
                    inputs,
                    ctx,
                    logger,
                    self.settings.default_timeout,
                )
                .await;
                match result {
                    Ok(outputs) => Ok(outputs),
                    Err(error) if error.is_catchable() => {
                        let catch_node = workflow.node(&params.catch).ok_or_else(|| EngineError::NodeNotFound(params.catch.clone()))?.clone();
                        if !self.executors.contains(&catch_node.node_type) {
                            return Err(EngineError::UnregisteredType(catch_node.node_type.clone()));
                        }
                        let mut catch_input = HashMap::new();
                        let catch_item = serde_json::json!({
                            "error": error.to_string(),
                            "nodeId": try_node.id.to_string(),
                            "message": error.to_string(),
                        });
                        catch_input.insert(HandleKey::default_handle(), catch_item.clone());
                        let catch_params = render_node_params(workflow, ctx, self.vault.as_deref(), logger, &catch_item, &catch_node.parameters)
                            .await
                            .map_err(|source| EngineError::NodeFailed { node_id: catch_node.id.clone(), source })?;
                        dispatch_registry_node(
                            &self.executors,
                            self.vault.as_deref(),
                            &catch_node,
                            catch_params,
                            catch_input,
                            ctx,
                            logger,
                            self.settings.default_timeout,
                        )
                        .await
                        .map_err(|source| EngineError::NodeFailed { node_id: catch_node.id, source })
                    }
                    Err(error) => Err(EngineError::NodeFailed { node_id: try_node.id, source: error }),
                }
            }
            "loop" => {
                let params = LoopParams::decode(&node.id, &node.parameters)?;
                let items = item
                    .get(params.items_field.as_str())
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| EngineError::BadParameters {
                        node_id: node.id.clone(),
                        node_type: "loop",
                        message: format!("input has no array field {:?}", params.items_field),
                    })?;

                let loop_handle = HandleKey::new("loop");
                let body_entry = workflow
                    .connections_from(&node.id)
                    .find(|c| c.from_handle == loop_handle)
                    .ok_or_else(|| EngineError::BadParameters {
                        node_id: node.id.clone(),
                        node_type: "loop",
                        message: "no connection on the \"loop\" handle".to_string(),
                    })?
                    .clone();

                // Per-iteration output stays local to this loop — only the
                // aggregated "done" array is ever written into the shared
                // `ExecutionContext`.
                let mut results = Vec::with_capacity(items.len());
                for current_item in items {
                    ctx.check_cancelled()?;
                    let result = self.run_loop_body(workflow, ctx, logger, rate_limiters, &body_entry.to_node, current_item).await?;
                    results.push(result);
                }

                let mut out = HashMap::new();
                out.insert(HandleKey::new("done"), Value::Array(results));
                Ok(out)
            }
            other => Err(EngineError::UnregisteredType(other.to_string())),
        }
    }

    /// Walks one loop iteration's body subgraph, starting at `body_entry`
    /// with `seed` as its input. Unlike the single linear chain this used
    /// to assume, the body may branch (`if`/`switch`) and converge again
    /// through a `merge` node — so this drains a local delivery queue the
    /// same way [`Self::run_rounds`] drains the workflow-level one, scoped
    /// entirely to this iteration (its own `fired`/`dead_connections`/
    /// `merge_pending`, discarded once the iteration ends). The iteration's
    /// result is whichever node's activated handle has no outgoing
    /// connection in the graph — the body's sink.
    async fn run_loop_body(
        &self,
        workflow: &Workflow,
        ctx: &ExecutionContext,
        logger: &ExecutionLogger,
        rate_limiters: &mut HashMap<NodeId, Arc<TokenBucket>>,
        body_entry: &NodeId,
        seed: Value,
    ) -> Result<Value, EngineError> {
        let mut fired: HashSet<NodeId> = HashSet::new();
        let mut dead_connections: HashSet<ConnectionId> = HashSet::new();
        let mut merge_pending: HashMap<NodeId, HashMap<ConnectionId, Value>> = HashMap::new();
        let mut queue: VecDeque<Delivery> = VecDeque::new();
        let mut result = seed.clone();

        queue.push_back(Delivery {
            connection_id: ConnectionId::new(format!("loop-seed:{body_entry}")),
            to_node: body_entry.clone(),
            to_handle: HandleKey::default_handle(),
            value: seed,
        });

        while let Some(delivery) = queue.pop_front() {
            ctx.check_cancelled()?;
            let node = workflow.node(&delivery.to_node).ok_or_else(|| EngineError::NodeNotFound(delivery.to_node.clone()))?.clone();

            let mut inputs = HashMap::new();
            if node.node_type == "merge" {
                let params = MergeParams::decode(&node.id, &node.parameters)?;
                if params.wait_for_all {
                    if fired.contains(&node.id) {
                        logger.branch_dropped(node.id.clone(), format!("merge already fired in loop body, dropping late arrival on {}", delivery.connection_id));
                        continue;
                    }
                    merge_pending.entry(node.id.clone()).or_default().insert(delivery.connection_id, delivery.value);
                    let live = workflow.connections_to(&node.id).filter(|c| !dead_connections.contains(&c.id)).count();
                    let arrived = merge_pending.get(&node.id).map_or(0, HashMap::len);
                    if arrived < live {
                        continue;
                    }
                    let mut pending = merge_pending.remove(&node.id).unwrap_or_default();
                    let merged = merge_values(workflow, &node.id, params.mode, &mut pending);
                    fired.insert(node.id.clone());
                    inputs.insert(HandleKey::default_handle(), merged);
                } else {
                    if fired.contains(&node.id) {
                        continue;
                    }
                    fired.insert(node.id.clone());
                    inputs.insert(HandleKey::default_handle(), delivery.value);
                }
            } else {
                if fired.contains(&node.id) {
                    logger.branch_dropped(node.id.clone(), format!("node already fired in loop body, dropping late arrival on {}", delivery.connection_id));
                    continue;
                }
                fired.insert(node.id.clone());
                inputs.insert(delivery.to_handle.clone(), delivery.value);
            }

            let outputs = if node.disabled {
                logger.node_skipped(node.id.clone(), "disabled");
                ctx.record_mut(&node.id, |r| r.skip());
                let value = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);
                let mut outputs = HashMap::new();
                outputs.insert(HandleKey::default_handle(), value);
                outputs
            } else if FLOW_CONTROL_TYPES.contains(&node.node_type.as_str()) {
                Box::pin(self.run_flow_node(workflow, &node, inputs, ctx, logger, rate_limiters)).await?
            } else {
                if !self.executors.contains(&node.node_type) {
                    return Err(EngineError::UnregisteredType(node.node_type.clone()));
                }
                let item = inputs.get(&HandleKey::default_handle()).cloned().unwrap_or(Value::Null);
                let rendered_params = render_node_params(workflow, ctx, self.vault.as_deref(), logger, &item, &node.parameters)
                    .await
                    .map_err(|source| EngineError::NodeFailed { node_id: node.id.clone(), source })?;
                dispatch_registry_node(
                    &self.executors,
                    self.vault.as_deref(),
                    &node,
                    rendered_params,
                    inputs,
                    ctx,
                    logger,
                    self.settings.default_timeout,
                )
                .await
                .map_err(|source| EngineError::NodeFailed { node_id: node.id.clone(), source })?
            };

            let mut deliveries = Vec::new();
            apply_output(workflow, ctx, &mut deliveries, &mut dead_connections, &node.id, outputs.clone());
            if deliveries.is_empty() {
                result = outputs.into_values().next().unwrap_or(Value::Null);
            }
            queue.extend(deliveries);
        }

        mark_excluded_nodes_skipped(workflow, ctx, &fired);

        Ok(result)
    }
}

/// Records `node_id`'s output and turns every activated handle into
/// queued deliveries; handles the node declared but didn't activate this
/// firing have their outgoing connections marked dead (consulted by
/// wait-all merges deciding whether every live predecessor has arrived).
fn apply_output(
    workflow: &Workflow,
    ctx: &ExecutionContext,
    deliveries: &mut Vec<Delivery>,
    dead_connections: &mut HashSet<ConnectionId>,
    node_id: &NodeId,
    outputs: HashMap<HandleKey, Value>,
) {
    let by_handle: HashMap<String, Value> = outputs.iter().map(|(h, v)| (h.as_str().to_string(), v.clone())).collect();
    ctx.set_node_output(node_id.clone(), by_handle);

    for conn in workflow.connections_from(node_id) {
        match outputs.get(&conn.from_handle) {
            Some(value) => deliveries.push(Delivery {
                connection_id: conn.id.clone(),
                to_node: conn.to_node.clone(),
                to_handle: conn.to_handle.clone(),
                value: value.clone(),
            }),
            None => {
                dead_connections.insert(conn.id.clone());
            }
        }
    }
}

/// Once a run's delivery queue has drained, any node with at least one
/// incoming connection that never fired was permanently excluded by an
/// upstream branch that didn't select it (the untaken side of an `if`, a
/// `switch` case nobody matched, a `parallel` branch not listed) — give it
/// a terminal `Skipped` record instead of leaving it silently absent.
fn mark_excluded_nodes_skipped(workflow: &Workflow, ctx: &ExecutionContext, fired: &HashSet<NodeId>) {
    for node in &workflow.nodes {
        if !fired.contains(&node.id) && workflow.connections_to(&node.id).next().is_some() {
            ctx.record_mut(&node.id, |r| r.skip());
        }
    }
}

/// Combine a wait-all merge's buffered per-connection values, in source
/// node lexical order, per the node's `mode`.
fn merge_values(workflow: &Workflow, node_id: &NodeId, mode: MergeMode, pending: &mut HashMap<ConnectionId, Value>) -> Value {
    let mut ordered: Vec<(NodeId, Value)> =
        workflow.connections_to(node_id).filter_map(|conn| pending.remove(&conn.id).map(|v| (conn.from_node.clone(), v))).collect();
    ordered.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

    match mode {
        MergeMode::Passthrough => ordered.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null),
        MergeMode::Concat => {
            let mut out = Vec::new();
            for (_, v) in ordered {
                match v {
                    Value::Array(items) => out.extend(items),
                    other => out.push(other),
                }
            }
            Value::Array(out)
        }
        MergeMode::Zip => Value::Object(ordered.into_iter().map(|(id, v)| (id.to_string(), v)).collect()),
    }
}

/// Run a registry-backed executor once: resolve its credential, apply its
/// timeout, and record the node's execution history. `parameters` is the
/// node's own configuration, already interpolated by the caller against
/// the current item — an executor itself never touches the template
/// engine.
async fn dispatch_registry_node(
    executors: &ExecutorRegistry,
    vault: Option<&dyn CredentialVault>,
    node: &Node,
    parameters: serde_json::Map<String, Value>,
    inputs: HashMap<HandleKey, Value>,
    ctx: &ExecutionContext,
    logger: &ExecutionLogger,
    default_timeout: Duration,
) -> Result<HashMap<HandleKey, Value>, ExecutorError> {
    let executor = executors.get(&node.node_type).map_err(|e| ExecutorError::config(e.to_string()))?;

    logger.node_started(node.id.clone());
    ctx.record_mut(&node.id, |r| r.start(Utc::now()));

    // A credential is resolved whenever the node names one, whether or not
    // the executor declares `requires_credential` — `requires_credential`
    // only controls whether its *absence* is a hard error (llmChat for a
    // paid provider) or fine (httpRequest, which may call an open endpoint).
    let mut credential = None;
    if let Some(cred_id) = node.credential_id.as_ref() {
        let vault = vault.ok_or_else(|| ExecutorError::config("node has a credentialId but no vault is configured"))?;
        let secret = vault.get_by_id(cred_id).await.map_err(|e| ExecutorError::config(e.to_string()))?;
        logger.register_secret(secret.expose());
        credential = Some((SecureString::new(secret.expose()), secret.kind()));
    } else if executor.metadata().requires_credential {
        return Err(ExecutorError::config("node declares requires_credential but has no credentialId"));
    }

    let mut exec_ctx =
        ExecutorContext::new(ctx.execution_id, node.id.clone(), ctx.cancellation.clone(), logger.clone()).with_parameters(parameters);
    if let Some((credential, kind)) = credential {
        exec_ctx = exec_ctx.with_credential(credential, kind);
    }

    let timeout = Duration::from_millis(node.timeout_ms.unwrap_or_else(|| default_timeout.as_millis() as u64));
    let executor_input = ExecutorInput { by_handle: inputs };

    let outcome = tokio::time::timeout(timeout, executor.execute(executor_input, &exec_ctx)).await;
    let now = Utc::now();

    match outcome {
        Ok(Ok(output)) => {
            logger.node_completed(node.id.clone());
            ctx.record_mut(&node.id, |r| r.finish_success(now));
            match output.signal {
                ExecutorSignal::Complete => Ok(output.outputs_by_handle),
                // A bare registry call outside a `retry`/`rateLimit` wrapper
                // has no loop to honor a pause signal — treat it as
                // complete with whatever handles it did activate.
                ExecutorSignal::RetryAfter { .. } | ExecutorSignal::WaitForCapacity { .. } => Ok(output.outputs_by_handle),
            }
        }
        Ok(Err(error)) => {
            logger.node_failed(node.id.clone(), &error);
            ctx.record_mut(&node.id, |r| r.finish_failed(now, error.to_string()));
            Err(error)
        }
        Err(_elapsed) => {
            let error = ExecutorError::timeout(timeout);
            logger.node_failed(node.id.clone(), &error);
            ctx.record_mut(&node.id, |r| r.finish_failed(now, error.to_string()));
            Err(error)
        }
    }
}

/// Registers every vault-sourced credential an `EvaluationContext` resolves
/// by name with the execution logger, the same as the numeric
/// `credentialId` path already does in `dispatch_registry_node` — so a
/// `{{CRED_NAME}}` alias redacts just as reliably as a `credentialId`.
struct LoggerSecretSink<'a>(&'a ExecutionLogger);

impl SecretSink for LoggerSecretSink<'_> {
    fn register_secret(&self, value: &str) {
        self.0.register_secret(value);
    }
}

/// Bridges the live [`ExecutionContext`] and [`Workflow`] settings into the
/// expression resolver's three-tier variable lookup.
struct EngineVariableResolver<'a> {
    exec_ctx: &'a ExecutionContext,
    workflow: &'a Workflow,
}

impl VariableResolver for EngineVariableResolver<'_> {
    fn execution_var(&self, name: &str) -> Option<Value> {
        self.exec_ctx.get_variable(name)
    }

    fn workflow_var(&self, name: &str) -> Option<Value> {
        self.workflow.settings.get("variables")?.get(name).cloned()
    }

    fn global_var(&self, _name: &str) -> Option<Value> {
        // No process-wide variable store is wired up; global scope always
        // falls through to node-output/current-item resolution.
        None
    }

    fn node_output(&self, name: &str) -> Option<Value> {
        self.exec_ctx.node_output(&NodeId::new(name), HandleKey::DEFAULT)
    }
}

/// Interpolate every string leaf of a node's `parameters` map against the
/// current item, recursively. Errors map to `ExecutorError::ConfigError`
/// — a template that references an unresolved variable is a workflow
/// authoring mistake, not a transient failure.
async fn render_node_params(
    workflow: &Workflow,
    ctx: &ExecutionContext,
    vault: Option<&dyn CredentialVault>,
    logger: &ExecutionLogger,
    item: &Value,
    params: &serde_json::Map<String, Value>,
) -> Result<serde_json::Map<String, Value>, ExecutorError> {
    let resolver = EngineVariableResolver { exec_ctx: ctx, workflow };
    let secret_sink = LoggerSecretSink(logger);
    let eval_ctx = EvaluationContext::new(vault, &resolver, item).with_secret_sink(&secret_sink);
    let mut rendered = serde_json::Map::with_capacity(params.len());
    for (key, value) in params {
        rendered.insert(key.clone(), render_value(value, &eval_ctx).await?);
    }
    Ok(rendered)
}

fn render_value<'a>(
    value: &'a Value,
    ctx: &'a EvaluationContext<'a>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value, ExecutorError>> + 'a>> {
    Box::pin(async move {
        match value {
            Value::String(s) => {
                let template = Template::new(s.as_str()).map_err(|e| ExecutorError::config(e.to_string()))?;
                let rendered = template.render(ctx).await.map_err(|e| ExecutorError::config(e.to_string()))?;
                Ok(Value::String(rendered))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(render_value(item, ctx).await?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), render_value(v, ctx).await?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    })
}

async fn render_template(node_id: &NodeId, node_type: &'static str, source: &str, ctx: &EvaluationContext<'_>) -> Result<String, EngineError> {
    let template =
        Template::new(source).map_err(|e| EngineError::BadParameters { node_id: node_id.clone(), node_type, message: e.to_string() })?;
    template
        .render(ctx)
        .await
        .map_err(|e| EngineError::NodeFailed { node_id: node_id.clone(), source: ExecutorError::config(e.to_string()) })
}

/// Numeric comparison when both sides parse as `f64`, otherwise lexical
/// string comparison — `if`'s `left`/`right` are always rendered template
/// output, i.e. plain strings.
fn compare(left: &str, right: &str, op: CompareOp) -> bool {
    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return match op {
            CompareOp::Gt => l > r,
            CompareOp::Gte => l >= r,
            CompareOp::Lt => l < r,
            CompareOp::Lte => l <= r,
            CompareOp::Eq => (l - r).abs() < f64::EPSILON,
            CompareOp::Neq => (l - r).abs() >= f64::EPSILON,
        };
    }
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Neq => left != right,
        CompareOp::Gt => left > right,
        CompareOp::Gte => left >= right,
        CompareOp::Lt => left < right,
        CompareOp::Lte => left <= right,
    }
}

fn trigger_matches(node_trigger: &TriggerKind, requested: &TriggerKind) -> bool {
    matches!(
        (node_trigger, requested),
        (TriggerKind::Manual, TriggerKind::Manual)
            | (TriggerKind::Schedule { .. }, TriggerKind::Schedule { .. })
            | (TriggerKind::Webhook { .. }, TriggerKind::Webhook { .. })
            | (TriggerKind::File { .. }, TriggerKind::File { .. })
    )
}
