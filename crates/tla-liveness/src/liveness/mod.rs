//! Liveness checking
//!
//! The pipeline for one property:
//! 1. [`tableau`] builds the tableau of the negated property
//! 2. [`behavior_graph`] grows the product of the state graph and the tableau
//! 3. [`scc`] finds reachable SCCs that keep every promise of the tableau
//! 4. [`lasso`] turns such an SCC into a counterexample
//!
//! [`checker`] runs the pipeline for each property over a shared state feed.

pub mod behavior_graph;
pub mod checker;
pub mod lasso;
pub mod live_expr;
pub mod scc;
pub mod tableau;

pub use behavior_graph::{BehaviorGraph, BehaviorGraphNode, GraphView, NodeId};
pub use checker::{
    CheckReport, IndeterminateReason, LivenessChecker, LivenessStats, Phase, PropertyReport,
    PropertyWorker, Verdict,
};
pub use lasso::Lasso;
pub use live_expr::LiveExpr;
pub use scc::{BadCycleDetector, ScanReport, Scc};
pub use tableau::{Tableau, TableauNodeId};
