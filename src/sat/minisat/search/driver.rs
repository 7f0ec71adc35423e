//! A stepwise interface to `Searcher` for external drivers — an SMS
//! enumeration harness, a proof checker, anything that wants single-literal
//! control over propagation and backtracking instead of the monolithic
//! restart/assumption loop in `Searcher::solve`.
//!
//! Every operation here is built out of `Searcher`'s existing private
//! primitives (`cancel_until`, `resolve_conflict`, `formula.propagate`) —
//! this module adds bookkeeping and a different outer loop, not new solving
//! machinery.

use std::time::{Duration, Instant};

use crate::sat::formula::{assignment::*, clause::ClauseRef, Lit};
use super::propagator::edge_lit;
use super::{AddClauseRes, Searcher};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PropagationResult {
    Conflict = -1,
    Open = 0,
    Sat = 1,
    InconsistentAssumptions = 2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnumerationTermination {
    Done,
    Time,
    Limit,
}

/// Outcome of a multi-step operation (`fast_switch_assignment`): a verdict
/// plus how much work it took to get there.
#[derive(Clone, Copy, Debug)]
pub struct StepResult {
    pub status: PropagationResult,
    pub decisions_executed: usize,
    pub propagated_literals: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct EnumerationReport {
    pub models_found: u64,
    pub termination: EnumerationTermination,
}

/// Wraps a `Searcher` and exposes it one step at a time. The cached
/// `conflict` ref is the seam between `propagate()` returning `Conflict`
/// and a subsequent `learn_clause()` call consuming it.
pub struct StepwiseDriver {
    searcher: Searcher,
    conflict: Option<ClauseRef>,
    scope: Vec<Lit>,
    scope_idx: usize,
}

impl StepwiseDriver {
    pub fn new(searcher: Searcher) -> Self {
        StepwiseDriver {
            searcher,
            conflict: None,
            scope: Vec::new(),
            scope_idx: 0,
        }
    }

    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    pub fn searcher_mut(&mut self) -> &mut Searcher {
        &mut self.searcher
    }

    pub fn into_inner(self) -> Searcher {
        self.searcher
    }

    fn is_full_assignment(&self) -> bool {
        self.searcher.formula.assigns.number_of_assigns() == self.searcher.number_of_vars()
    }

    /// Runs unit propagation to a fixpoint. Returns the verdict plus how
    /// many literals were newly placed on the trail.
    pub fn propagate(&mut self) -> (PropagationResult, usize) {
        let before = self.searcher.formula.assigns.number_of_assigns();
        match self.searcher.formula.propagate() {
            Some(cr) => {
                self.conflict = Some(cr);
                let after = self.searcher.formula.assigns.number_of_assigns();
                (PropagationResult::Conflict, after - before)
            }
            None => {
                self.conflict = None;
                let after = self.searcher.formula.assigns.number_of_assigns();
                let newly = after - before;
                if self.is_full_assignment() {
                    (PropagationResult::Sat, newly)
                } else {
                    (PropagationResult::Open, newly)
                }
            }
        }
    }

    /// Opens a fresh decision level, enqueues `lit`, and propagates.
    pub fn assign_literal(&mut self, lit: Lit) -> (PropagationResult, usize) {
        self.searcher.formula.push_decision(lit);
        self.propagate()
    }

    /// Undoes the top `n` decision levels. Fails (leaving state untouched)
    /// if `n` exceeds the current decision level.
    pub fn backtrack(&mut self, n: usize) -> bool {
        let level = self.searcher.formula.assigns.current_level().offset();
        if n > level {
            return false;
        }
        self.conflict = None;
        self.searcher.cancel_until(DecisionLevel::from_offset(level - n));
        true
    }

    /// Runs 1-UIP analysis on the cached conflict, backjumps, installs the
    /// learnt clause, and propagates. Requires a preceding `propagate()`
    /// (or `assign_literal()`) that returned `Conflict`; otherwise a no-op
    /// that just reports the current propagation state.
    pub fn learn_clause(&mut self) -> PropagationResult {
        let cr = match self.conflict.take() {
            Some(cr) => cr,
            None => return self.propagate().0,
        };

        if self.searcher.resolve_conflict(cr) {
            self.propagate().0
        } else {
            self.searcher.ok = false;
            PropagationResult::Conflict
        }
    }

    fn trail_from_level(&self, level: usize) -> &[Lit] {
        let assigns = &self.searcher.formula.assigns;
        if level == 0 {
            assigns.trail()
        } else {
            assigns.trail_above(DecisionLevel::from_offset(level - 1))
        }
    }

    /// Primes iteration over the trail starting at `level`, inclusive.
    pub fn request_propagation_scope(&mut self, level: usize) {
        self.scope = self.trail_from_level(level).to_vec();
        self.scope_idx = 0;
    }

    /// Yields the next literal in the scope opened by
    /// `request_propagation_scope`, or `None` once exhausted.
    pub fn next_prop_lit(&mut self) -> Option<Lit> {
        if self.scope_idx < self.scope.len() {
            let lit = self.scope[self.scope_idx];
            self.scope_idx += 1;
            Some(lit)
        } else {
            None
        }
    }

    /// One literal per open decision level, in order — the decisions
    /// `fast_switch_assignment` tries to keep as a prefix.
    fn current_decisions(&self) -> Vec<Lit> {
        let assigns = &self.searcher.formula.assigns;
        let top = assigns.current_level().offset();
        let mut decisions = Vec::with_capacity(top);
        for level in 0..top {
            if let Some(&lit) = assigns.trail_above(DecisionLevel::from_offset(level)).first() {
                decisions.push(lit);
            }
        }
        decisions
    }

    /// Given a sorted target assignment, backjumps to the deepest prefix of
    /// current decisions still contained in it, then re-decides whatever of
    /// the target remains, propagating between each. `target` must be
    /// sorted (by `Lit`'s `Ord`) so membership can be tested by binary
    /// search.
    pub fn fast_switch_assignment(&mut self, target: &[Lit]) -> StepResult {
        let decisions = self.current_decisions();
        let mut keep = 0;
        for &d in decisions.iter() {
            if target.binary_search(&d).is_ok() {
                keep += 1;
            } else {
                break;
            }
        }

        self.conflict = None;
        self.searcher.cancel_until(DecisionLevel::from_offset(keep));

        let mut decisions_executed = 0usize;
        let mut propagated_literals = 0usize;

        for &lit in target.iter() {
            match self.searcher.formula.assigns.of_lit(lit) {
                LitVal::True => continue,

                LitVal::False => {
                    return StepResult {
                        status: PropagationResult::InconsistentAssumptions,
                        decisions_executed,
                        propagated_literals,
                    };
                }

                LitVal::Undef => {
                    let (status, newly) = self.assign_literal(lit);
                    decisions_executed += 1;
                    propagated_literals += newly;

                    match status {
                        PropagationResult::Conflict | PropagationResult::Sat => {
                            return StepResult { status, decisions_executed, propagated_literals };
                        }
                        PropagationResult::Open => {}
                        PropagationResult::InconsistentAssumptions => unreachable!(),
                    }
                }
            }
        }

        let status = if self.is_full_assignment() { PropagationResult::Sat } else { PropagationResult::Open };
        StepResult { status, decisions_executed, propagated_literals }
    }

    /// Drives propagation and decisions (via the ordinary activity
    /// heuristic) to a fixpoint: either a full satisfying assignment or
    /// a permanent conflict. No restarts, no assumptions — `run_solver_enumerate`
    /// is only ever asked to re-solve after a single blocking clause has
    /// been added at the ground level, so a restart-free loop suffices.
    fn drive_to_completion(&mut self) -> PropagationResult {
        loop {
            let (status, _) = self.propagate();
            match status {
                PropagationResult::Conflict => match self.learn_clause() {
                    PropagationResult::Conflict => return PropagationResult::Conflict,
                    _ => continue,
                },

                PropagationResult::Sat => return PropagationResult::Sat,

                PropagationResult::Open => match self.searcher.heur.pick_branch_lit(&self.searcher.formula.assigns) {
                    Some(lit) => {
                        self.searcher.formula.push_decision(lit);
                    }
                    None => return PropagationResult::Sat,
                },

                PropagationResult::InconsistentAssumptions => unreachable!(),
            }
        }
    }

    /// Repeatedly solves; on every SAT result, blocks the *edge-variable*
    /// portion of the model only (the graph adjacency, not auxiliary
    /// variables) with a unit clause added at the ground level, and
    /// continues. Stops on UNSAT (exhaustive), `timeout`, or `max_models`.
    pub fn run_solver_enumerate(&mut self, n_vertices: usize, timeout: Duration, max_models: u64) -> EnumerationReport {
        let start = Instant::now();
        let mut models_found = 0u64;

        loop {
            if start.elapsed() >= timeout {
                return EnumerationReport { models_found, termination: EnumerationTermination::Time };
            }
            if models_found >= max_models {
                return EnumerationReport { models_found, termination: EnumerationTermination::Limit };
            }

            match self.drive_to_completion() {
                PropagationResult::Sat => {
                    models_found += 1;

                    let mut blocking = Vec::new();
                    for i in 0..n_vertices {
                        for j in (i + 1)..n_vertices {
                            let lit = edge_lit(i, j);
                            let true_now = self.searcher.formula.assigns.is_assigned_pos(lit);
                            blocking.push(if true_now { !lit } else { lit });
                        }
                    }

                    self.searcher.cancel_until(GROUND_LEVEL);
                    self.conflict = None;

                    match self.searcher.add_clause(&blocking) {
                        AddClauseRes::UnSAT => {
                            return EnumerationReport { models_found, termination: EnumerationTermination::Done };
                        }
                        _ => {}
                    }
                }

                _ => return EnumerationReport { models_found, termination: EnumerationTermination::Done },
            }
        }
    }
}
