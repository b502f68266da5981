//! Drives a compiled workflow graph to completion.
//!
//! Single logical thread of control: one node executes at a time, fully,
//! before its successor is chosen. The runner owns the campaign state, the
//! monitor and the analytics; stages see the state read-only and the
//! router sees it through the decision hook.

use crate::analytics::{AnalyticsReport, CampaignAnalytics};
use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{EdgeTarget, WorkflowGraph};
use crate::monitor::{ExecutionMonitor, MonitorPhase, MonitorSummary};
use crate::router::{CompletionReason, RevisionRouter, RouteDecision};
use crate::state::{Brief, CampaignState};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Progress events emitted during a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    StageStarted { node: String, step: u32 },
    StageCompleted { node: String, step: u32 },
    RevisionDispatched { target: String, revision: u32 },
    DecisionComplete { reason: CompletionReason },
}

/// Result of a finished campaign run.
#[derive(Debug, Serialize)]
pub struct CampaignRun {
    pub run_id: Uuid,
    /// Final campaign state with artifacts, feedback and revision count.
    pub state: CampaignState,
    /// Why the revision loop exited; `None` only for graphs that reach END
    /// without passing the decision node.
    pub completion: Option<CompletionReason>,
    /// Node executions consumed.
    pub steps: u32,
    pub monitor_phase: MonitorPhase,
    pub monitor_summary: MonitorSummary,
    pub analytics: AnalyticsReport,
}

impl CampaignRun {
    /// Whether the run converged (rather than being cut off by the clock).
    pub fn converged(&self) -> bool {
        self.monitor_phase == MonitorPhase::Completed
    }
}

/// Executes a [`WorkflowGraph`] against one campaign brief.
pub struct WorkflowRunner {
    graph: WorkflowGraph,
    router: RevisionRouter,
    monitor: ExecutionMonitor,
    analytics: CampaignAnalytics,
    max_steps: u32,
    event_tx: Option<mpsc::Sender<RunEvent>>,
}

impl WorkflowRunner {
    pub fn new(graph: WorkflowGraph, config: &WorkflowConfig) -> Self {
        Self {
            graph,
            router: RevisionRouter::new(config.max_revisions, config.quality_threshold),
            monitor: ExecutionMonitor::new(config.max_duration()),
            analytics: CampaignAnalytics::new(),
            max_steps: config.max_steps,
            event_tx: None,
        }
    }

    /// Attach a progress-event channel.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).await.ok();
        }
    }

    /// Run the graph to a terminal state.
    ///
    /// Upstream service failures never surface here (stages degrade); the
    /// only error paths are structural: an impossible route or the step
    /// ceiling, both of which indicate a broken graph definition.
    pub async fn run(mut self, brief: Brief) -> Result<CampaignRun, GraphError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, nodes = self.graph.node_count(), "starting campaign run");
        self.monitor.mark_running();

        let mut state = CampaignState::new(brief);
        let mut current = self.graph.start().to_string();
        let mut steps: u32 = 0;
        let mut completion: Option<CompletionReason> = None;

        loop {
            steps += 1;
            if steps > self.max_steps {
                self.monitor.mark_exhausted();
                error!(
                    limit = self.max_steps,
                    node = %current,
                    "step ceiling exceeded; routing never terminated"
                );
                return Err(GraphError::StepCeilingExceeded {
                    limit: self.max_steps,
                });
            }

            self.emit(RunEvent::StageStarted {
                node: current.clone(),
                step: steps,
            })
            .await;

            let stage = self.graph.node(&current).ok_or_else(|| GraphError::UnknownNode {
                node: current.clone(),
                role: "runner",
            })?;
            let delta = stage.execute(&state).await;
            if let Some(note) = delta.note.as_deref() {
                debug!(node = %current, note, "stage note");
            }
            state.apply(delta);

            self.emit(RunEvent::StageCompleted {
                node: current.clone(),
                step: steps,
            })
            .await;

            let next = self.successor(&current, &mut state, &mut completion).await?;
            match next {
                EdgeTarget::End => break,
                EdgeTarget::Node(node) => current = node,
            }
        }

        if completion != Some(CompletionReason::Timeout) {
            self.monitor.mark_completed();
        }

        info!(
            %run_id,
            steps,
            revisions = state.revision_count,
            phase = ?self.monitor.phase(),
            "campaign run finished"
        );

        Ok(CampaignRun {
            run_id,
            state,
            completion,
            steps,
            monitor_phase: self.monitor.phase(),
            monitor_summary: self.monitor.summary(),
            analytics: self.analytics.report(),
        })
    }

    /// Choose the next node after `current` has executed.
    async fn successor(
        &mut self,
        current: &str,
        state: &mut CampaignState,
        completion: &mut Option<CompletionReason>,
    ) -> Result<EdgeTarget, GraphError> {
        if self.graph.is_decision(current) {
            return self.decide(state, completion).await;
        }

        if self.graph.in_fanout_region(current) {
            return self
                .graph
                .fanout_route(state)
                .ok_or_else(|| GraphError::MissingSuccessor {
                    node: current.to_string(),
                });
        }

        self.graph
            .static_successor(current)
            .cloned()
            .ok_or_else(|| GraphError::MissingSuccessor {
                node: current.to_string(),
            })
    }

    /// The decision point. On the initial pass (no feedback yet) execution
    /// proceeds to the declared initial target; on every later visit the
    /// router decides between completing and dispatching a revision.
    async fn decide(
        &mut self,
        state: &mut CampaignState,
        completion: &mut Option<CompletionReason>,
    ) -> Result<EdgeTarget, GraphError> {
        let spec = self.graph.decision();

        if state.feedback.is_empty() {
            debug!(to = %spec.initial_target, "initial pass; entering the pipeline");
            return Ok(EdgeTarget::Node(spec.initial_target.clone()));
        }

        self.analytics.track_iteration(state);

        match self.router.route(state, &mut self.monitor) {
            RouteDecision::Complete(reason) => {
                info!(%reason, "decision: complete");
                *completion = Some(reason);
                if reason == CompletionReason::Timeout {
                    self.monitor.mark_timed_out();
                }
                self.emit(RunEvent::DecisionComplete { reason }).await;
                Ok(spec.complete_target.clone())
            }
            RouteDecision::Revise(target) => {
                let target_node = target.node_id();
                if !spec.whitelist.iter().any(|n| n == target_node) {
                    return Err(GraphError::RouteNotAllowed {
                        node: spec.node.clone(),
                        target: target_node.to_string(),
                    });
                }
                state.revision_count += 1;
                info!(
                    to = target_node,
                    revision = state.revision_count,
                    "decision: revise"
                );
                self.emit(RunEvent::RevisionDispatched {
                    target: target_node.to_string(),
                    revision: state.revision_count,
                })
                .await;
                Ok(EdgeTarget::Node(target_node.to_string()))
            }
        }
    }
}
