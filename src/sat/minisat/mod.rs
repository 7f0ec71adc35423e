use crate::sat::{SolveRes, Solver, Stats};
use crate::sat::formula::{Lit, Var};
use self::budget::Budget;
use self::search::clause_db::ClauseDBSettings;
pub use self::search::conflict::CCMinMode;
use self::search::decision_heuristic::DecisionHeuristicSettings;
pub use self::search::decision_heuristic::PhaseSaving;
use self::search::driver::StepwiseDriver;
use self::search::propagator::{ExternalPropagator, PropagatorPort};
use self::search::{AddClauseRes, SearchSettings, Searcher, SearcherSettings};

pub mod budget;
pub mod search;


#[derive(Default)]
pub struct CoreSettings {
    pub heur: DecisionHeuristicSettings,
    pub db: ClauseDBSettings,
    pub ccmin_mode: CCMinMode,
    pub search: SearchSettings,
    pub core: SearcherSettings,
}


/// The CDCL core, optionally wired to an external theory oracle (an SMS
/// symmetry-breaking module, say) consulted at every stabilised search
/// node. There is no `SimpSolver` counterpart here: preprocessing via
/// variable elimination is out of scope.
pub struct CoreSolver {
    ok: bool,
    ss: SearchSettings,
    search: Searcher,
    propagator: Option<PropagatorPort>,
}

impl Solver for CoreSolver {
    fn n_vars(&self) -> usize {
        self.search.number_of_vars()
    }

    fn n_clauses(&self) -> usize {
        self.search.number_of_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        self.search.new_var(upol, dvar)
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        if self.ok {
            if let AddClauseRes::UnSAT = self.search.add_clause(clause) {
                self.ok = false;
            }
        }
        self.ok
    }

    fn preprocess(&mut self, _: &Budget) -> bool {
        if self.ok {
            self.ok = self.search.preprocess();
        }
        self.ok
    }

    fn solve_limited(self, budget: &Budget, assumptions: &[Lit]) -> SolveRes<Self> {
        if !self.ok {
            return SolveRes::UnSAT(self.search.sat_stats());
        }

        let CoreSolver { ss, search, mut propagator, .. } = self;
        match search.solve(&ss, budget, propagator.as_mut(), assumptions) {
            SolveRes::UnSAT(stats) => SolveRes::UnSAT(stats),
            SolveRes::SAT(model, stats) => SolveRes::SAT(model, stats),
            SolveRes::Interrupted(progress, s) => {
                SolveRes::Interrupted(progress, CoreSolver { ok: true, ss, search: s, propagator })
            }
        }
    }

    fn stats(&self) -> Stats {
        self.search.sat_stats()
    }
}

impl CoreSolver {
    pub fn new(settings: CoreSettings) -> Self {
        CoreSolver {
            ok: true,
            ss: settings.search,
            search: Searcher::new(settings.core, settings.db, settings.heur, settings.ccmin_mode),
            propagator: None,
        }
    }

    /// Wires an external theory oracle (e.g. an SMS symmetry-breaking
    /// module) over an `n`-vertex edge-variable encoding into the search
    /// loop. Only meaningful before the first `solve_limited` call.
    pub fn attach_propagator(&mut self, n_vertices: usize, oracle: Box<dyn ExternalPropagator>) {
        self.propagator = Some(PropagatorPort::new(n_vertices, oracle));
    }

    /// Hands the underlying searcher off to a `StepwiseDriver` for
    /// fine-grained external control (propagate/assign/backtrack one step
    /// at a time) instead of the restart-driven `solve_limited` loop.
    pub fn into_stepwise(self) -> StepwiseDriver {
        StepwiseDriver::new(self.search)
    }
}
