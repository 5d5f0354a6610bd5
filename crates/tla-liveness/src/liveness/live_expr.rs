//! Live expression AST for temporal formulas
//!
//! Properties handed to the checker are `LiveExpr` values. Atoms are
//! predicates the model evaluator understands, named by [`PredicateId`]:
//! 1. State predicates are evaluated on a single state
//! 2. Action predicates are evaluated on a step `(s, s')`
//!
//! Negation may appear anywhere; [`LiveExpr::push_negation`] rewrites a
//! formula into positive normal form before tableau construction.

use crate::model::PredicateId;
use std::fmt;

/// A liveness expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiveExpr {
    /// Boolean constant (TRUE or FALSE)
    Bool(bool),

    /// State predicate - evaluated on a single state
    StatePred(PredicateId),

    /// Action predicate - evaluated on a state transition (s, s')
    ActionPred(PredicateId),

    /// Conjunction: P /\ Q /\ ...
    And(Vec<LiveExpr>),

    /// Disjunction: P \/ Q \/ ...
    Or(Vec<LiveExpr>),

    /// Negation: ~P
    Not(Box<LiveExpr>),

    /// Always: []P
    Always(Box<LiveExpr>),

    /// Eventually: <>P
    Eventually(Box<LiveExpr>),

    /// Next: ()P. Produced by tableau expansion; not accepted in properties.
    Next(Box<LiveExpr>),
}

impl LiveExpr {
    pub fn true_const() -> Self {
        LiveExpr::Bool(true)
    }

    pub fn false_const() -> Self {
        LiveExpr::Bool(false)
    }

    pub fn state_pred(pred: PredicateId) -> Self {
        LiveExpr::StatePred(pred)
    }

    pub fn action_pred(pred: PredicateId) -> Self {
        LiveExpr::ActionPred(pred)
    }

    /// Create a conjunction
    pub fn and(exprs: Vec<LiveExpr>) -> Self {
        let mut exprs = exprs;
        match exprs.len() {
            0 => LiveExpr::Bool(true),
            1 => exprs.remove(0),
            _ => LiveExpr::And(exprs),
        }
    }

    /// Create a disjunction
    pub fn or(exprs: Vec<LiveExpr>) -> Self {
        let mut exprs = exprs;
        match exprs.len() {
            0 => LiveExpr::Bool(false),
            1 => exprs.remove(0),
            _ => LiveExpr::Or(exprs),
        }
    }

    /// Create a negation
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: LiveExpr) -> Self {
        match expr {
            LiveExpr::Bool(b) => LiveExpr::Bool(!b),
            LiveExpr::Not(inner) => *inner,
            _ => LiveExpr::Not(Box::new(expr)),
        }
    }

    /// P => Q, as ~P \/ Q
    pub fn implies(lhs: LiveExpr, rhs: LiveExpr) -> Self {
        LiveExpr::or(vec![LiveExpr::not(lhs), rhs])
    }

    pub fn always(expr: LiveExpr) -> Self {
        LiveExpr::Always(Box::new(expr))
    }

    pub fn eventually(expr: LiveExpr) -> Self {
        LiveExpr::Eventually(Box::new(expr))
    }

    pub fn next(expr: LiveExpr) -> Self {
        LiveExpr::Next(Box::new(expr))
    }

    /// P ~> Q, as [](P => <>Q)
    pub fn leads_to(lhs: LiveExpr, rhs: LiveExpr) -> Self {
        LiveExpr::always(LiveExpr::implies(lhs, LiveExpr::eventually(rhs)))
    }

    /// []<>P
    pub fn infinitely_often(expr: LiveExpr) -> Self {
        LiveExpr::always(LiveExpr::eventually(expr))
    }

    /// <>[]P
    pub fn eventually_always(expr: LiveExpr) -> Self {
        LiveExpr::eventually(LiveExpr::always(expr))
    }

    /// Weak fairness of an action: <>[]enabled => []<>taken
    pub fn weak_fairness(enabled: PredicateId, taken: PredicateId) -> Self {
        LiveExpr::implies(
            LiveExpr::eventually_always(LiveExpr::StatePred(enabled)),
            LiveExpr::infinitely_often(LiveExpr::ActionPred(taken)),
        )
    }

    /// Strong fairness of an action: []<>enabled => []<>taken
    pub fn strong_fairness(enabled: PredicateId, taken: PredicateId) -> Self {
        LiveExpr::implies(
            LiveExpr::infinitely_often(LiveExpr::StatePred(enabled)),
            LiveExpr::infinitely_often(LiveExpr::ActionPred(taken)),
        )
    }

    /// Check if this expression contains any action-level subexpressions
    pub fn contains_action(&self) -> bool {
        match self {
            LiveExpr::Bool(_) | LiveExpr::StatePred(_) => false,
            LiveExpr::ActionPred(_) => true,
            LiveExpr::Not(e) => e.contains_action(),
            LiveExpr::And(es) | LiveExpr::Or(es) => es.iter().any(|e| e.contains_action()),
            LiveExpr::Always(e) | LiveExpr::Eventually(e) | LiveExpr::Next(e) => {
                e.contains_action()
            }
        }
    }

    /// Check if this expression uses the internal next operator
    pub fn contains_next(&self) -> bool {
        match self {
            LiveExpr::Bool(_) | LiveExpr::StatePred(_) | LiveExpr::ActionPred(_) => false,
            LiveExpr::Next(_) => true,
            LiveExpr::Not(e) | LiveExpr::Always(e) | LiveExpr::Eventually(e) => e.contains_next(),
            LiveExpr::And(es) | LiveExpr::Or(es) => es.iter().any(|e| e.contains_next()),
        }
    }

    fn is_atom(&self) -> bool {
        matches!(
            self,
            LiveExpr::Bool(_) | LiveExpr::StatePred(_) | LiveExpr::ActionPred(_)
        )
    }

    /// Check if this expression is in positive normal form
    /// (negation only applied to atoms)
    pub fn is_positive_form(&self) -> bool {
        match self {
            LiveExpr::Bool(_) | LiveExpr::StatePred(_) | LiveExpr::ActionPred(_) => true,
            LiveExpr::Not(inner) => inner.is_atom(),
            LiveExpr::And(es) | LiveExpr::Or(es) => es.iter().all(|e| e.is_positive_form()),
            LiveExpr::Always(e) | LiveExpr::Eventually(e) | LiveExpr::Next(e) => {
                e.is_positive_form()
            }
        }
    }

    /// Push negation down to atoms (convert to positive normal form)
    ///
    /// Uses the following rewriting rules (Manna & Pnueli, p. 452):
    /// - ~TRUE = FALSE
    /// - ~FALSE = TRUE
    /// - ~~P = P
    /// - ~(P /\ Q) = ~P \/ ~Q
    /// - ~(P \/ Q) = ~P /\ ~Q
    /// - ~[]P = <>~P
    /// - ~<>P = []~P
    /// - ~()P = ()~P
    pub fn push_negation(self) -> Self {
        self.push_neg_inner(false)
    }

    fn push_neg_inner(self, negate: bool) -> Self {
        if negate {
            match self {
                LiveExpr::Bool(b) => LiveExpr::Bool(!b),
                LiveExpr::StatePred(_) | LiveExpr::ActionPred(_) => LiveExpr::Not(Box::new(self)),
                LiveExpr::Not(inner) => inner.push_neg_inner(false),
                LiveExpr::And(es) => {
                    LiveExpr::Or(es.into_iter().map(|e| e.push_neg_inner(true)).collect())
                }
                LiveExpr::Or(es) => {
                    LiveExpr::And(es.into_iter().map(|e| e.push_neg_inner(true)).collect())
                }
                LiveExpr::Always(e) => LiveExpr::Eventually(Box::new(e.push_neg_inner(true))),
                LiveExpr::Eventually(e) => LiveExpr::Always(Box::new(e.push_neg_inner(true))),
                LiveExpr::Next(e) => LiveExpr::Next(Box::new(e.push_neg_inner(true))),
            }
        } else {
            match self {
                LiveExpr::Bool(_) | LiveExpr::StatePred(_) | LiveExpr::ActionPred(_) => self,
                LiveExpr::Not(inner) => inner.push_neg_inner(true),
                LiveExpr::And(es) => {
                    LiveExpr::And(es.into_iter().map(|e| e.push_neg_inner(false)).collect())
                }
                LiveExpr::Or(es) => {
                    LiveExpr::Or(es.into_iter().map(|e| e.push_neg_inner(false)).collect())
                }
                LiveExpr::Always(e) => LiveExpr::Always(Box::new(e.push_neg_inner(false))),
                LiveExpr::Eventually(e) => LiveExpr::Eventually(Box::new(e.push_neg_inner(false))),
                LiveExpr::Next(e) => LiveExpr::Next(Box::new(e.push_neg_inner(false))),
            }
        }
    }

    /// Extract all "promise" subformulas from this formula.
    ///
    /// Promises are the subformulas of the form `<>r`, deduplicated, in
    /// pre-order. Call on a formula in positive normal form; `~[]P` is only
    /// recognized as a promise after [`push_negation`](Self::push_negation).
    pub fn extract_promises(&self) -> Vec<LiveExpr> {
        fn go(expr: &LiveExpr, out: &mut Vec<LiveExpr>) {
            match expr {
                LiveExpr::Eventually(inner) => {
                    if !out.contains(expr) {
                        out.push(expr.clone());
                    }
                    go(inner, out);
                }
                LiveExpr::Not(inner) | LiveExpr::Always(inner) | LiveExpr::Next(inner) => {
                    go(inner, out);
                }
                LiveExpr::And(es) | LiveExpr::Or(es) => {
                    for e in es {
                        go(e, out);
                    }
                }
                LiveExpr::Bool(_) | LiveExpr::StatePred(_) | LiveExpr::ActionPred(_) => {}
            }
        }

        let mut promises = Vec::new();
        go(self, &mut promises);
        promises
    }
}

impl fmt::Display for LiveExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveExpr::Bool(true) => write!(f, "TRUE"),
            LiveExpr::Bool(false) => write!(f, "FALSE"),
            LiveExpr::StatePred(p) => write!(f, "S{}", p.0),
            LiveExpr::ActionPred(p) => write!(f, "A{}", p.0),
            LiveExpr::Not(e) => write!(f, "~{}", e),
            LiveExpr::And(es) => {
                write!(f, "(")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, " /\\ ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            LiveExpr::Or(es) => {
                write!(f, "(")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, " \\/ ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            LiveExpr::Always(e) => write!(f, "[]{}", e),
            LiveExpr::Eventually(e) => write!(f, "<>{}", e),
            LiveExpr::Next(e) => write!(f, "(){}", e),
        }
    }
}
