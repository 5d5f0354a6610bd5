//! Liveness checking orchestration
//!
//! [`LivenessChecker`] checks several properties against one model. A single
//! [`Explorer`] drives the model evaluator and fills a shared [`StateFeed`];
//! each property gets a [`PropertyWorker`] that owns its tableau product,
//! detector and lasso, and consumes the feed at its own pace.
//!
//! Per property the worker moves through
//! `Building -> Exploring -> {Violated, Satisfied, Indeterminate}`.
//!
//! Scans run at fixed feed positions (every `scan_interval` events in
//! periodic mode, and once after the last event), so the verdict and the
//! lasso of a run do not depend on thread timing.

use crate::config::LivenessConfig;
use crate::error::{EvalError, LivenessError, LivenessResult};
use crate::feed::{ConsumerGuard, Explorer, ExplorerConfig, FeedEvent, FeedStatus, StateFeed};
use crate::fingerprint::Fingerprint;
use crate::liveness::behavior_graph::{BehaviorGraph, NodeId};
use crate::liveness::lasso::{self, Lasso};
use crate::liveness::live_expr::LiveExpr;
use crate::liveness::scc::BadCycleDetector;
use crate::liveness::tableau::Tableau;
use crate::model::{EvalContext, EvalStats, ModelEvaluator};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of one property check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Building,
    Exploring,
    Violated,
    Satisfied,
    Indeterminate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Building => "building",
            Phase::Exploring => "exploring",
            Phase::Violated => "violated",
            Phase::Satisfied => "satisfied",
            Phase::Indeterminate => "indeterminate",
        };
        f.write_str(name)
    }
}

/// Why a check ended without a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndeterminateReason {
    /// The model evaluator failed
    Evaluation(EvalError),
    /// Exploration stopped at `max_states`
    StateLimit { limit: usize },
    /// Exploration was stopped before the worker finished
    Cancelled,
}

impl fmt::Display for IndeterminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndeterminateReason::Evaluation(e) => write!(f, "{}", e),
            IndeterminateReason::StateLimit { limit } => {
                write!(f, "state limit of {} reached", limit)
            }
            IndeterminateReason::Cancelled => write!(f, "exploration cancelled"),
        }
    }
}

/// Outcome of checking one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<S> {
    /// No behavior violates the property
    Satisfied,
    /// A behavior violating the property
    Violated(Lasso<S>),
    Indeterminate(IndeterminateReason),
}

impl<S> Verdict<S> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }

    pub fn is_violated(&self) -> bool {
        matches!(self, Verdict::Violated(_))
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Verdict::Indeterminate(_))
    }

    pub fn lasso(&self) -> Option<&Lasso<S>> {
        match self {
            Verdict::Violated(lasso) => Some(lasso),
            _ => None,
        }
    }

    fn phase(&self) -> Phase {
        match self {
            Verdict::Satisfied => Phase::Satisfied,
            Verdict::Violated(_) => Phase::Violated,
            Verdict::Indeterminate(_) => Phase::Indeterminate,
        }
    }
}

/// Counters for one property check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessStats {
    pub tableau_nodes: usize,
    pub product_nodes: usize,
    pub product_edges: usize,
    /// Scans that ran (skipped re-scans are not counted)
    pub scans: u64,
    /// SCCs examined over all scans
    pub sccs_scanned: usize,
    /// Violating SCCs found by the last scan
    pub violating_sccs: usize,
    pub events_consumed: usize,
    pub eval: EvalStats,
}

/// Result for one property
#[derive(Debug, Clone)]
pub struct PropertyReport<S> {
    pub name: String,
    pub outcome: LivenessResult<Verdict<S>>,
    pub stats: LivenessStats,
}

impl<S> PropertyReport<S> {
    pub fn verdict(&self) -> Option<&Verdict<S>> {
        self.outcome.as_ref().ok()
    }
}

/// Result of a [`LivenessChecker::check`] run
#[derive(Debug, Clone)]
pub struct CheckReport<S> {
    /// One report per property, in registration order
    pub properties: Vec<PropertyReport<S>>,
    /// How exploration ended
    pub feed_status: FeedStatus,
    /// Distinct states the explorer stored
    pub states_explored: usize,
}

impl<S> CheckReport<S> {
    pub fn property(&self, name: &str) -> Option<&PropertyReport<S>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// True when every property is satisfied
    pub fn all_satisfied(&self) -> bool {
        self.properties
            .iter()
            .all(|p| matches!(p.outcome, Ok(Verdict::Satisfied)))
    }

    /// The first violated property and its lasso
    pub fn first_violation(&self) -> Option<(&str, &Lasso<S>)> {
        self.properties.iter().find_map(|p| match &p.outcome {
            Ok(Verdict::Violated(lasso)) => Some((p.name.as_str(), lasso)),
            _ => None,
        })
    }
}

/// Checks one property by consuming a [`StateFeed`]
pub struct PropertyWorker<'a, M: ModelEvaluator> {
    name: String,
    model: &'a M,
    feed: &'a StateFeed<M::State>,
    _reader: ConsumerGuard<'a, M::State>,
    scan_every: Option<usize>,
    batch: usize,
    graph: BehaviorGraph<M::State>,
    detector: BadCycleDetector,
    /// Successors of every state seen in an `Expanded` event
    known: FxHashMap<Fingerprint, Arc<[Fingerprint]>>,
    ctx: EvalContext,
    cursor: usize,
    phase: Phase,
    stats: LivenessStats,
}

impl<'a, M: ModelEvaluator> PropertyWorker<'a, M> {
    pub fn new(
        name: impl Into<String>,
        tableau: Arc<Tableau>,
        model: &'a M,
        feed: &'a StateFeed<M::State>,
        config: &LivenessConfig,
    ) -> Self {
        let stats = LivenessStats {
            tableau_nodes: tableau.len(),
            ..LivenessStats::default()
        };
        Self {
            name: name.into(),
            model,
            feed,
            _reader: feed.register_consumer(),
            scan_every: config.scan_every(),
            batch: config.feed_batch.max(1),
            graph: BehaviorGraph::new(tableau),
            detector: BadCycleDetector::new(),
            known: FxHashMap::default(),
            ctx: EvalContext::new(),
            cursor: 0,
            phase: Phase::Building,
            stats,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn graph(&self) -> &BehaviorGraph<M::State> {
        &self.graph
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(property = %self.name, from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
    }

    /// Consume the feed until the property is decided or the feed is done.
    pub fn run(mut self) -> PropertyReport<M::State> {
        self.set_phase(Phase::Exploring);
        let outcome = self.drive();
        let phase = match &outcome {
            Ok(verdict) => verdict.phase(),
            Err(_) => Phase::Indeterminate,
        };
        self.set_phase(phase);

        self.stats.product_nodes = self.graph.len();
        self.stats.product_edges = self.graph.edge_count();
        self.stats.eval = self.ctx.stats();
        match &outcome {
            Ok(Verdict::Violated(lasso)) => info!(
                property = %self.name,
                lasso_len = lasso.len(),
                cycle_start = lasso.cycle_start(),
                "property violated"
            ),
            Ok(Verdict::Satisfied) => info!(property = %self.name, "property satisfied"),
            Ok(Verdict::Indeterminate(reason)) => {
                warn!(property = %self.name, %reason, "property check indeterminate")
            }
            Err(e) => warn!(property = %self.name, error = %e, "property check failed"),
        }
        PropertyReport {
            name: self.name,
            outcome,
            stats: self.stats,
        }
    }

    fn drive(&mut self) -> LivenessResult<Verdict<M::State>> {
        loop {
            let batch = self.feed.wait_events(self.cursor, self.batch);
            if batch.events.is_empty() {
                return self.conclude(batch.status);
            }
            for event in &batch.events {
                self.cursor += 1;
                self.stats.events_consumed += 1;
                match self.apply(event) {
                    Ok(()) => {}
                    Err(LivenessError::Evaluation(e)) => {
                        return Ok(Verdict::Indeterminate(IndeterminateReason::Evaluation(e)))
                    }
                    Err(e) => return Err(e),
                }
                if self.scan_every.is_some_and(|n| self.cursor % n == 0) {
                    if let Some(lasso) = self.scan()? {
                        return Ok(Verdict::Violated(lasso));
                    }
                }
            }
        }
    }

    /// Final scan once the feed has nothing more to give.
    fn conclude(&mut self, status: FeedStatus) -> LivenessResult<Verdict<M::State>> {
        if let Some(lasso) = self.scan()? {
            return Ok(Verdict::Violated(lasso));
        }
        let verdict = match status {
            FeedStatus::Exhausted => Verdict::Satisfied,
            FeedStatus::Truncated { limit } => {
                Verdict::Indeterminate(IndeterminateReason::StateLimit { limit })
            }
            FeedStatus::Failed(e) => Verdict::Indeterminate(IndeterminateReason::Evaluation(e)),
            FeedStatus::Running | FeedStatus::Cancelled => {
                Verdict::Indeterminate(IndeterminateReason::Cancelled)
            }
        };
        Ok(verdict)
    }

    fn apply(&mut self, event: &FeedEvent) -> LivenessResult<()> {
        let created = match event {
            FeedEvent::Initial(fp) => {
                let entries = self.resolve(std::slice::from_ref(fp));
                self.graph
                    .extend_initial(self.model, &mut self.ctx, &entries)?
            }
            FeedEvent::Expanded { source, successors } => {
                self.known.insert(*source, Arc::clone(successors));
                let entries = self.resolve(successors);
                self.graph
                    .extend(self.model, &mut self.ctx, *source, &entries)?
            }
        };
        self.grow(created)
    }

    /// Expand newly created nodes whose state's successors are already known.
    fn grow(&mut self, mut worklist: Vec<NodeId>) -> LivenessResult<()> {
        while let Some(node) = worklist.pop() {
            let fp = self.graph.node(node).key.state_fp;
            let Some(successors) = self.known.get(&fp).cloned() else {
                continue;
            };
            let entries = self.resolve(&successors);
            let created = self
                .graph
                .expand_node(self.model, &mut self.ctx, node, &entries)?;
            worklist.extend(created);
        }
        Ok(())
    }

    fn resolve(&self, fps: &[Fingerprint]) -> Vec<(Fingerprint, M::State)> {
        fps.iter()
            .filter_map(|&fp| {
                self.graph
                    .state(fp)
                    .cloned()
                    .or_else(|| self.feed.state(fp))
                    .map(|state| (fp, state))
            })
            .collect()
    }

    fn scan(&mut self) -> LivenessResult<Option<Lasso<M::State>>> {
        let report = {
            let view = self.graph.snapshot();
            self.detector.scan(&view)
        };
        let Some(report) = report else {
            return Ok(None);
        };
        self.stats.scans = self.detector.scans();
        self.stats.sccs_scanned += report.sccs_scanned;
        self.stats.violating_sccs = report.violating.len();
        match report.violating.first() {
            Some(scc) => {
                debug!(property = %self.name, scc = %scc, "violating SCC found");
                lasso::extract(scc, &self.graph).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Checks liveness properties of a model
pub struct LivenessChecker<'m, M: ModelEvaluator> {
    model: &'m M,
    config: LivenessConfig,
    properties: Vec<(String, LiveExpr)>,
    fairness: Option<LiveExpr>,
}

impl<'m, M: ModelEvaluator> LivenessChecker<'m, M> {
    pub fn new(model: &'m M, config: LivenessConfig) -> Self {
        Self {
            model,
            config,
            properties: Vec::new(),
            fairness: None,
        }
    }

    /// Add a property to check
    pub fn property(mut self, name: impl Into<String>, expr: LiveExpr) -> Self {
        self.properties.push((name.into(), expr));
        self
    }

    /// Assume `fairness` for every property: only behaviors satisfying it
    /// can be counterexamples. Repeated calls conjoin the assumptions.
    pub fn fairness(mut self, fairness: LiveExpr) -> Self {
        self.fairness = Some(match self.fairness.take() {
            Some(existing) => LiveExpr::and(vec![existing, fairness]),
            None => fairness,
        });
        self
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    fn build_tableau(&self, name: &str, expr: &LiveExpr) -> LivenessResult<Arc<Tableau>> {
        debug!(property = %name, phase = %Phase::Building, %expr, "building tableau");
        let tableau = match &self.fairness {
            Some(fairness) => Tableau::build_with_fairness(expr, fairness)?,
            None => Tableau::build(expr)?,
        };
        Ok(Arc::new(tableau))
    }

    /// Explore the model and check every property.
    pub fn check(&self) -> CheckReport<M::State> {
        info!(
            properties = self.properties.len(),
            mode = %self.config.check_mode,
            parallel = self.config.parallel,
            "starting liveness check"
        );
        let mut slots: Vec<Option<PropertyReport<M::State>>> = Vec::new();
        let mut jobs: Vec<(usize, String, Arc<Tableau>)> = Vec::new();
        for (name, expr) in &self.properties {
            match self.build_tableau(name, expr) {
                Ok(tableau) => {
                    jobs.push((slots.len(), name.clone(), tableau));
                    slots.push(None);
                }
                Err(e) => {
                    warn!(property = %name, error = %e, "property rejected");
                    slots.push(Some(PropertyReport {
                        name: name.clone(),
                        outcome: Err(e),
                        stats: LivenessStats::default(),
                    }));
                }
            }
        }

        let feed = StateFeed::new();
        let feed_status = if jobs.is_empty() {
            FeedStatus::Cancelled
        } else {
            let explorer = Explorer::new(self.model, &feed, self.explorer_config());
            let workers: Vec<(usize, PropertyWorker<'_, M>)> = jobs
                .into_iter()
                .map(|(slot, name, tableau)| {
                    (
                        slot,
                        PropertyWorker::new(name, tableau, self.model, &feed, &self.config),
                    )
                })
                .collect();

            let (status, reports) = if self.config.parallel {
                run_parallel(&explorer, workers)
            } else {
                let status = explorer.run(&mut EvalContext::new());
                let reports = workers
                    .into_iter()
                    .map(|(slot, worker)| (slot, worker.run()))
                    .collect();
                (status, reports)
            };
            for (slot, report) in reports {
                slots[slot] = Some(report);
            }
            status
        };

        CheckReport {
            properties: slots.into_iter().flatten().collect(),
            feed_status,
            states_explored: feed.state_count(),
        }
    }

    fn explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            stuttering: self.config.stuttering,
            max_states: self.config.max_states,
            batch: self.config.feed_batch.max(1),
        }
    }
}

type WorkerReports<S> = Vec<(usize, PropertyReport<S>)>;

/// One explorer thread and one thread per worker.
fn run_parallel<M: ModelEvaluator>(
    explorer: &Explorer<'_, M>,
    workers: Vec<(usize, PropertyWorker<'_, M>)>,
) -> (FeedStatus, WorkerReports<M::State>) {
    std::thread::scope(|s| {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|(slot, worker)| s.spawn(move || (slot, worker.run())))
            .collect();
        let explore = s.spawn(|| explorer.run(&mut EvalContext::new()));

        let reports = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect();
        let status = explore
            .join()
            .unwrap_or_else(|e| std::panic::resume_unwind(e));
        (status, reports)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LivenessCheckMode;
    use crate::explicit::{ExplicitModel, ExplicitState};
    use crate::model::PredicateId;

    const AT_ZERO: PredicateId = PredicateId(0);

    /// x: 0 -> 1 -> 2 -> 2, predicate P0 = `x = 0`
    fn stuck_model() -> ExplicitModel {
        let mut b = ExplicitModel::builder(["x"]);
        let s0 = b.state([0]);
        let s1 = b.state([1]);
        let s2 = b.state([2]);
        b.initial(s0).path(&[s0, s1, s2, s2]);
        b.state_predicate(AT_ZERO, |s: &ExplicitState| s.get("x") == Some(0));
        b.build()
    }

    fn config(parallel: bool) -> LivenessConfig {
        LivenessConfig {
            parallel,
            scan_interval: 1,
            ..LivenessConfig::default()
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Building.to_string(), "building");
        assert_eq!(Phase::Indeterminate.to_string(), "indeterminate");
    }

    #[test]
    fn test_worker_reports_violation() {
        let m = stuck_model();
        let report = LivenessChecker::new(&m, config(false))
            .property("often_zero", LiveExpr::infinitely_often(LiveExpr::state_pred(AT_ZERO)))
            .check();

        let prop = report.property("often_zero").unwrap();
        let lasso = prop.verdict().and_then(Verdict::lasso).unwrap();
        assert!(lasso.cycle.iter().all(|s| s.get("x") == Some(2)));
        assert!(prop.stats.scans >= 1);
        assert!(prop.stats.product_nodes > 0);
        assert_eq!(report.feed_status, FeedStatus::Exhausted);
        assert_eq!(report.states_explored, 3);
    }

    #[test]
    fn test_malformed_property_keeps_its_slot() {
        let m = stuck_model();
        let report = LivenessChecker::new(&m, config(false))
            .property("safety", LiveExpr::always(LiveExpr::state_pred(AT_ZERO)))
            .property("live", LiveExpr::eventually(LiveExpr::state_pred(AT_ZERO)))
            .check();

        assert_eq!(report.properties[0].name, "safety");
        assert!(matches!(
            report.properties[0].outcome,
            Err(LivenessError::MalformedProperty { .. })
        ));
        // x = 0 holds initially
        assert_eq!(report.properties[1].outcome, Ok(Verdict::Satisfied));
        assert!(!report.all_satisfied());
    }

    #[test]
    fn test_final_mode_scans_once() {
        let m = stuck_model();
        let config = LivenessConfig {
            check_mode: LivenessCheckMode::Final,
            ..config(false)
        };
        let report = LivenessChecker::new(&m, config)
            .property("often_zero", LiveExpr::infinitely_often(LiveExpr::state_pred(AT_ZERO)))
            .check();
        let prop = &report.properties[0];
        assert!(prop.verdict().unwrap().is_violated());
        assert_eq!(prop.stats.scans, 1);
    }

    #[test]
    fn test_no_properties_skips_exploration() {
        let m = stuck_model();
        let report = LivenessChecker::new(&m, config(true)).check();
        assert!(report.properties.is_empty());
        assert_eq!(report.states_explored, 0);
        assert_eq!(report.feed_status, FeedStatus::Cancelled);
    }
}
