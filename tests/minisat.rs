use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use minisms::sat::formula::Lit;
use minisms::sat::minisat::budget::Budget;
use minisms::sat::minisat::search::clause_db::ClauseDBSettings;
use minisms::sat::minisat::search::conflict::CCMinMode;
use minisms::sat::minisat::search::decision_heuristic::DecisionHeuristicSettings;
use minisms::sat::minisat::search::driver::{EnumerationTermination, PropagationResult, StepwiseDriver};
use minisms::sat::minisat::search::ingest::{self, IngestResult};
use minisms::sat::minisat::search::propagator::{CheckResult, EdgeSnapshot, EdgeValue, ExternalPropagator};
use minisms::sat::minisat::search::{Searcher, SearcherSettings};
use minisms::sat::minisat::{CoreSettings, CoreSolver};
use minisms::sat::{SolveRes, Solver};

fn open_budget() -> Budget {
    let mut b = Budget::new();
    b.off();
    b
}

fn bare_searcher() -> Searcher {
    Searcher::new(
        SearcherSettings::default(),
        ClauseDBSettings::default(),
        DecisionHeuristicSettings::default(),
        CCMinMode::default(),
    )
}

/// Scenario 1: a trivially satisfiable instance with no external propagator
/// attached solves directly — there is nothing to consult and nothing to
/// absorb.
#[test]
fn trivial_sat_without_propagator() {
    let mut solver = CoreSolver::new(CoreSettings::default());
    solver.new_var(None, true);
    solver.new_var(None, true);
    assert!(solver.add_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(2)]));

    match solver.solve_limited(&open_budget(), &[]) {
        SolveRes::SAT(model, _) => assert_eq!(model.len(), 2),
        _ => panic!("expected SAT"),
    }
}

/// Scenario 2: a root-level conflict (`x1` and `-x1` both asserted as unit
/// clauses) is caught by `add_clause` itself; `solve_limited` reports UNSAT
/// without ever entering the search loop.
#[test]
fn unsat_by_root_conflict() {
    let mut solver = CoreSolver::new(CoreSettings::default());
    solver.new_var(None, true);
    assert!(solver.add_clause(&[Lit::from_dimacs(1)]));
    assert!(!solver.add_clause(&[Lit::from_dimacs(-1)]));

    match solver.solve_limited(&open_budget(), &[]) {
        SolveRes::UnSAT(stats) => assert_eq!(stats.conflicts, 0),
        _ => panic!("expected UnSAT"),
    }
}

/// Scenario 3: an external propagator watching the edge variables for a
/// 4-vertex graph forbids edge(2,1) true together with edge(3,0) false by
/// handing back a lemma the first time it sees that combination. The final
/// model must respect it, and the oracle must actually have been consulted.
struct ForbidThreeFour {
    called: Rc<Cell<bool>>,
}

impl ExternalPropagator for ForbidThreeFour {
    fn check(&mut self, snapshot: &EdgeSnapshot) -> CheckResult {
        self.called.set(true);
        if snapshot.get(2, 1) == EdgeValue::True && snapshot.get(3, 0) == EdgeValue::False {
            CheckResult::Lemma(vec![Lit::from_dimacs(-3), Lit::from_dimacs(4)])
        } else {
            CheckResult::Ok
        }
    }
}

#[test]
fn symmetry_lemma_is_absorbed_and_respected() {
    let called = Rc::new(Cell::new(false));
    let mut solver = CoreSolver::new(CoreSettings::default());
    for _ in 0..6 {
        solver.new_var(None, true);
    }
    solver.attach_propagator(4, Box::new(ForbidThreeFour { called: called.clone() }));

    match solver.solve_limited(&open_budget(), &[]) {
        SolveRes::SAT(model, _) => {
            assert!(called.get(), "oracle was never consulted");
            let edge3_true = model[2] == Lit::from_dimacs(3);
            let edge4_false = model[3] == Lit::from_dimacs(-4);
            assert!(!(edge3_true && edge4_false), "lemma was not respected by the final model");
        }
        _ => panic!("expected SAT"),
    }
}

/// Scenario 4: mid-search ingestion of `[-1 -2 3]` against decisions
/// `1=T@1, 2=T@2, 3=F@3`. Every literal is already false, and only `3`
/// (the highest-level one) sits at the top level — the clause is already
/// asserting once rewound past level 2, so this is the direct
/// cancel/attach/assert case, not a conflict requiring fresh analysis.
#[test]
fn mid_search_ingestion_asserts_without_fresh_analysis() {
    let mut searcher = bare_searcher();
    searcher.new_var(None, true);
    searcher.new_var(None, true);
    searcher.new_var(None, true);
    let mut driver = StepwiseDriver::new(searcher);

    driver.assign_literal(Lit::from_dimacs(1));
    driver.assign_literal(Lit::from_dimacs(2));
    driver.assign_literal(Lit::from_dimacs(-3));
    assert_eq!(driver.searcher().assigns().current_level().offset(), 3);

    let clause = vec![Lit::from_dimacs(-1), Lit::from_dimacs(-2), Lit::from_dimacs(3)];
    let result = ingest::add_clause_during_search(driver.searcher_mut(), &clause);
    assert!(matches!(result, IngestResult::Ok));

    assert_eq!(driver.searcher().assigns().current_level().offset(), 2);
    assert!(driver.searcher().assigns().is_assigned_pos(Lit::from_dimacs(3)));
    assert!(driver.searcher().assigns().is_assigned_pos(Lit::from_dimacs(2)));
}

/// Scenario 5: enumerating a 3-vertex "exactly one edge present" instance
/// (plus one unconstrained auxiliary variable, to show the blocking clause
/// ignores it) must find exactly the 3 distinct edge patterns and then
/// report exhaustion.
#[test]
fn enumerate_blocks_on_edge_variables_only() {
    let mut searcher = bare_searcher();
    for _ in 0..3 {
        searcher.new_var(None, true);
    }
    searcher.new_var(None, true); // auxiliary, unconstrained

    searcher.add_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(2), Lit::from_dimacs(3)]);
    searcher.add_clause(&[Lit::from_dimacs(-1), Lit::from_dimacs(-2)]);
    searcher.add_clause(&[Lit::from_dimacs(-1), Lit::from_dimacs(-3)]);
    searcher.add_clause(&[Lit::from_dimacs(-2), Lit::from_dimacs(-3)]);

    let mut driver = StepwiseDriver::new(searcher);
    let report = driver.run_solver_enumerate(3, Duration::from_secs(5), 100);

    assert_eq!(report.models_found, 3);
    assert_eq!(report.termination, EnumerationTermination::Done);
}

/// Scenario 6: switching from decisions `[1, -2, 3]` to target `[1, 3, -4]`
/// keeps the `1` prefix (the only one still present in the target), drops
/// `-2`, and replays `3` and `-4` as two fresh decisions.
#[test]
fn fast_switch_keeps_common_prefix_and_replays_the_rest() {
    let mut searcher = bare_searcher();
    for _ in 0..4 {
        searcher.new_var(None, true);
    }
    let mut driver = StepwiseDriver::new(searcher);

    driver.assign_literal(Lit::from_dimacs(1));
    driver.assign_literal(Lit::from_dimacs(-2));
    driver.assign_literal(Lit::from_dimacs(3));

    let mut target = vec![Lit::from_dimacs(1), Lit::from_dimacs(3), Lit::from_dimacs(-4)];
    target.sort();
    let result = driver.fast_switch_assignment(&target);

    assert_eq!(result.decisions_executed, 2);
    assert_eq!(result.status, PropagationResult::Open);
    assert_eq!(driver.searcher().assigns().current_level().offset(), 3);
    assert!(driver.searcher().assigns().is_assigned_pos(Lit::from_dimacs(1)));
    assert!(driver.searcher().assigns().is_assigned_pos(Lit::from_dimacs(3)));
    assert!(driver.searcher().assigns().is_assigned_pos(Lit::from_dimacs(-4)));
}
