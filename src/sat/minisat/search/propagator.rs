//! The external-propagator seam: a theory oracle consulted once propagation
//! reaches a fixpoint, given a snapshot of the edge-variable assignment over
//! an `n`-vertex graph and returning either nothing, a single lemma, or a
//! batch of lemmas to absorb via [`super::ingest::add_clause_during_search`].

use crate::sat::formula::Lit;
use super::ingest::{self, IngestResult};
use super::Searcher;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeValue {
    True,
    False,
    Unknown,
}

/// The SAT variable backing the edge between vertices `i` and `j` (`i != j`),
/// per the classical triangular numbering `i*(i-1)/2 + j + 1` for `j < i`.
pub fn edge_var(i: usize, j: usize) -> u32 {
    let (hi, lo) = if i > j { (i, j) } else { (j, i) };
    (hi * (hi - 1) / 2 + lo + 1) as u32
}

pub fn edge_lit(i: usize, j: usize) -> Lit {
    Lit::from_dimacs(edge_var(i, j) as i32)
}

/// A symmetric `n x n` snapshot of the edge-variable assignment, handed to
/// the oracle at every stabilised search node.
pub struct EdgeSnapshot {
    n: usize,
    values: Vec<EdgeValue>,
    pub is_full: bool,
}

impl EdgeSnapshot {
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> EdgeValue {
        if i == j {
            EdgeValue::False
        } else {
            self.values[i * self.n + j]
        }
    }
}

pub enum CheckResult {
    Ok,
    Lemma(Vec<Lit>),
    Lemmas(Vec<Vec<Lit>>),
}

/// Implemented by a theory oracle such as an SMS symmetry-breaking module.
/// `check` must not retain the snapshot past the call: the solver's
/// assignment backing it will change on the very next step.
pub trait ExternalPropagator {
    fn check(&mut self, snapshot: &EdgeSnapshot) -> CheckResult;
}

pub enum PropagatorVerdict {
    Continue,
    Retry,
    Unsat,
}

/// Wires an [`ExternalPropagator`] into the search loop: builds the edge
/// snapshot from the current trail, delegates its verdict to dynamic clause
/// ingestion, and reports back whether the search can proceed, must retry
/// propagation, or has been refuted outright.
pub struct PropagatorPort {
    n_vertices: usize,
    oracle: Box<dyn ExternalPropagator>,
}

impl PropagatorPort {
    pub fn new(n_vertices: usize, oracle: Box<dyn ExternalPropagator>) -> Self {
        PropagatorPort { n_vertices, oracle }
    }

    fn snapshot(&self, searcher: &Searcher) -> EdgeSnapshot {
        let n = self.n_vertices;
        let mut values = vec![EdgeValue::Unknown; n * n];
        let mut is_full = true;

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let lit = edge_lit(i, j);
                let value = match searcher.assigns().of_lit(lit) {
                    crate::sat::formula::assignment::LitVal::True => EdgeValue::True,
                    crate::sat::formula::assignment::LitVal::False => EdgeValue::False,
                    crate::sat::formula::assignment::LitVal::Undef => {
                        is_full = false;
                        EdgeValue::Unknown
                    }
                };
                values[i * n + j] = value;
            }
        }

        EdgeSnapshot { n, values, is_full }
    }

    pub fn consult(&mut self, searcher: &mut Searcher) -> PropagatorVerdict {
        let snapshot = self.snapshot(searcher);
        match self.oracle.check(&snapshot) {
            CheckResult::Ok => PropagatorVerdict::Continue,

            CheckResult::Lemma(lits) => self.absorb(searcher, lits),

            CheckResult::Lemmas(lemmas) => {
                let mut verdict = PropagatorVerdict::Continue;
                for lits in lemmas {
                    match self.absorb(searcher, lits) {
                        PropagatorVerdict::Continue => {}
                        other => {
                            verdict = other;
                            break;
                        }
                    }
                }
                verdict
            }
        }
    }

    fn absorb(&mut self, searcher: &mut Searcher, lits: Vec<Lit>) -> PropagatorVerdict {
        match ingest::add_clause_during_search(searcher, &lits) {
            IngestResult::Ok => PropagatorVerdict::Retry,
            IngestResult::UnsatAtRoot => PropagatorVerdict::Unsat,
        }
    }
}
