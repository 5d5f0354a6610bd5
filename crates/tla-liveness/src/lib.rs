//! tla-liveness - explicit-state liveness checking for TLA+ models
//!
//! Decides whether every infinite behavior of a model satisfies a temporal
//! property, and produces a lasso-shaped counterexample when one does not.
//!
//! # Features
//!
//! - Tableau construction for the negated property (with optional fairness)
//! - On-the-fly product of the state graph and the tableau
//! - SCC-based detection of accepting cycles
//! - Lasso extraction (finite prefix plus repeating cycle)
//! - One worker per property over a shared, append-only state feed
//!
//! # Example
//!
//! ```
//! use tla_liveness::explicit::{ExplicitModel, ExplicitState};
//! use tla_liveness::{LiveExpr, LivenessChecker, LivenessConfig, PredicateId};
//!
//! let at_zero = PredicateId(0);
//! let mut b = ExplicitModel::builder(["x"]);
//! let s0 = b.state([0]);
//! let s1 = b.state([1]);
//! b.initial(s0);
//! b.path(&[s0, s1, s1]);
//! b.state_predicate(at_zero, |s: &ExplicitState| s.get("x") == Some(0));
//! let model = b.build();
//!
//! let report = LivenessChecker::new(&model, LivenessConfig::default())
//!     .property("OftenZero", LiveExpr::infinitely_often(LiveExpr::state_pred(at_zero)))
//!     .check();
//! let (name, lasso) = report.first_violation().unwrap();
//! assert_eq!(name, "OftenZero");
//! assert!(lasso.cycle.iter().all(|s| s.get("x") == Some(1)));
//! ```

pub mod config;
pub mod error;
pub mod explicit;
pub mod feed;
pub mod fingerprint;
pub mod liveness;
pub mod model;

pub use config::{ConfigError, LivenessCheckMode, LivenessConfig};
pub use error::{EvalError, EvalResult, LivenessError, LivenessResult};
pub use feed::{FeedStatus, StateFeed};
pub use fingerprint::Fingerprint;
pub use liveness::{
    CheckReport, IndeterminateReason, Lasso, LiveExpr, LivenessChecker, LivenessStats,
    PropertyReport, Tableau, Verdict,
};
pub use model::{EvalContext, ModelEvaluator, PredicateId};
