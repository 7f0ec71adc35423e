pub mod backtrack;
pub mod clause_db;
pub mod conflict;
pub mod decision_heuristic;
pub mod driver;
pub mod ingest;
pub mod luby;
pub mod propagator;
pub mod random;
pub mod watches;

use crate::sat::{SolveRes, Stats as SatStats};
use crate::sat::formula::{assignment::*, clause::*, Lit, LitMap, Var};
use self::backtrack::BacktrackableFormula;
use self::clause_db::{ClauseDB, ClauseDBSettings};
use self::conflict::{AnalyzeContext, CCMinMode, Conflict};
use self::decision_heuristic::{DecisionHeuristic, DecisionHeuristicSettings};
use self::propagator::{PropagatorPort, PropagatorVerdict};
use super::budget::Budget;


pub enum AddClauseRes {
    UnSAT,
    Tautology,
    AlreadySat,
    Added(Option<ClauseRef>),
}


#[derive(Clone, Copy, Debug)]
pub struct RestartStrategy {
    pub luby_restart: bool,
    pub restart_first: f64,
    pub restart_inc: f64,
}

impl Default for RestartStrategy {
    fn default() -> Self {
        RestartStrategy { luby_restart: true, restart_first: 100.0, restart_inc: 2.0 }
    }
}


#[derive(Clone, Copy, Debug)]
pub struct LearningStrategy {
    pub min_learnts_lim: usize,
    pub size_factor: f64,
    pub size_inc: f64,
    pub size_adjust_start_confl: u64,
    pub size_adjust_inc: f64,
}

impl Default for LearningStrategy {
    fn default() -> Self {
        LearningStrategy {
            min_learnts_lim: 0,
            size_factor: 1.0 / 3.0,
            size_inc: 1.1,
            size_adjust_start_confl: 100,
            size_adjust_inc: 1.5,
        }
    }
}

/// Tracks the (growing) ceiling on learnt-clause count that `reduceDB`
/// enforces, widening it every `size_adjust_confl` conflicts.
struct LearningGuard<'s> {
    settings: &'s LearningStrategy,
    max_learnts: f64,
    size_adjust_confl: f64,
    size_adjust_cnt: i64,
}

impl<'s> LearningGuard<'s> {
    fn new(settings: &'s LearningStrategy) -> Self {
        LearningGuard { settings, max_learnts: 0.0, size_adjust_confl: 0.0, size_adjust_cnt: 0 }
    }

    fn reset(&mut self, n_clauses: usize) {
        self.max_learnts = (n_clauses as f64 * self.settings.size_factor).max(self.settings.min_learnts_lim as f64);
        self.size_adjust_confl = self.settings.size_adjust_start_confl as f64;
        self.size_adjust_cnt = self.size_adjust_confl as i64;
    }

    fn max_learnts(&self) -> f64 {
        self.max_learnts
    }

    fn bump(&mut self) {
        self.size_adjust_cnt -= 1;
        if self.size_adjust_cnt == 0 {
            self.size_adjust_confl *= self.settings.size_adjust_inc;
            self.size_adjust_cnt = self.size_adjust_confl as i64;
            self.max_learnts *= self.settings.size_inc;
        }
    }
}


#[derive(Clone, Copy, Debug)]
pub struct SearchSettings {
    pub restart: RestartStrategy,
    pub learn: LearningStrategy,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings { restart: RestartStrategy::default(), learn: LearningStrategy::default() }
    }
}


pub struct SearcherSettings {
    /// Fraction of wasted arena bytes allowed before a GC sweep is triggered.
    pub garbage_frac: f64,
}

impl Default for SearcherSettings {
    fn default() -> Self {
        SearcherSettings { garbage_frac: 0.20 }
    }
}


#[derive(Clone, Copy, Default, Debug)]
struct Stats {
    solves: u64,
    starts: u64,
    decisions: u64,
    conflicts: u64,
}


enum LoopRes {
    Restart,
    UnSAT,
    SAT,
    Interrupted(f64),
    AssumpsConfl(LitMap<()>),
}


enum NextAssumption {
    Decide(Lit),
    Conflict(LitMap<()>),
    None,
}


/// The CDCL engine proper: clause database, watch-list propagation, the
/// trail/arena pair, decision heuristic and conflict analysis. Owns no
/// restart policy or external-propagator wiring — `solve` threads those in
/// so this type stays usable from the stepwise driver too.
pub struct Searcher {
    pub settings: SearcherSettings,
    stats: Stats,
    ok: bool,
    db: ClauseDB,
    formula: BacktrackableFormula,
    heur: DecisionHeuristic,
    analyze: AnalyzeContext,
}

impl Searcher {
    pub fn new(
        settings: SearcherSettings,
        db_settings: ClauseDBSettings,
        heur_settings: DecisionHeuristicSettings,
        ccmin_mode: CCMinMode,
    ) -> Self {
        Searcher {
            settings,
            stats: Stats::default(),
            ok: true,
            db: ClauseDB::new(db_settings),
            formula: BacktrackableFormula::new(),
            heur: DecisionHeuristic::new(heur_settings),
            analyze: AnalyzeContext::new(ccmin_mode),
        }
    }

    pub fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.formula.new_var();
        self.heur.init_var(v, upol, dvar);
        self.analyze.init_var(v);
        v
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn number_of_vars(&self) -> usize {
        self.formula.assigns.number_of_vars()
    }

    pub fn number_of_clauses(&self) -> usize {
        self.db.stats.num_clauses
    }

    pub fn assigns(&self) -> &Assignment {
        &self.formula.assigns
    }

    pub fn sat_stats(&self) -> SatStats {
        SatStats {
            solves: self.stats.solves,
            restarts: self.stats.starts,
            decisions: self.stats.decisions,
            rnd_decisions: self.heur.rnd_decisions,
            conflicts: self.stats.conflicts,
            propagations: self.formula.propagations(),
            tot_literals: self.analyze.tot_literals,
            del_literals: self.analyze.max_literals - self.analyze.tot_literals,
        }
    }

    pub fn add_clause(&mut self, ps: &[Lit]) -> AddClauseRes {
        assert!(self.formula.is_ground_level());
        if !self.ok {
            return AddClauseRes::UnSAT;
        }

        let mut lits = ps.to_vec();
        lits.sort();
        lits.dedup();

        for w in lits.windows(2) {
            if w[0] == !w[1] {
                return AddClauseRes::Tautology;
            }
        }

        let mut out = Vec::with_capacity(lits.len());
        for &lit in lits.iter() {
            match self.formula.assigns.of_lit(lit) {
                LitVal::True => return AddClauseRes::AlreadySat,
                LitVal::False => {}
                LitVal::Undef => out.push(lit),
            }
        }

        match out.len() {
            0 => {
                self.ok = false;
                AddClauseRes::UnSAT
            }

            1 => {
                if try_assign_lit(&mut self.formula.assigns, out[0], None) {
                    AddClauseRes::Added(None)
                } else {
                    self.ok = false;
                    AddClauseRes::UnSAT
                }
            }

            _ => {
                let cr = self.db.add_clause(&mut self.formula.ca, &out);
                self.formula.attach(cr);
                AddClauseRes::Added(Some(cr))
            }
        }
    }

    pub fn preprocess(&mut self) -> bool {
        if !self.ok {
            return false;
        }

        match self.formula.propagate() {
            Some(_) => {
                self.ok = false;
                false
            }
            None => {
                if self.formula.is_ground_level() {
                    self.simplify()
                } else {
                    true
                }
            }
        }
    }

    fn check_garbage(&self) -> bool {
        self.formula.ca.check_garbage(self.settings.garbage_frac)
    }

    fn garbage_collect(&mut self) {
        let mut to = ClauseAllocator::new_for_gc(&self.formula.ca);
        self.db.reloc_gc(&mut self.formula.ca, &mut to);
        self.formula.reloc_gc(&mut to);
        self.formula.ca = to;
    }

    fn simplify(&mut self) -> bool {
        if !self.ok {
            return false;
        }
        debug_assert!(self.formula.is_ground_level());

        {
            let watches = &mut self.formula.watches;
            self.db.remove_satisfied(&mut self.formula.ca, &self.formula.assigns, |c| {
                watches.unwatch_clause_lazy(c)
            });
        }

        self.heur.rebuild_order_heap(&self.formula.assigns);

        if self.check_garbage() {
            self.garbage_collect();
        }

        true
    }

    fn reduce_db(&mut self) {
        {
            let watches = &mut self.formula.watches;
            self.db.reduce(&mut self.formula.ca, &self.formula.assigns, |c| {
                watches.unwatch_clause_lazy(c)
            });
        }

        if self.check_garbage() {
            self.garbage_collect();
        }
    }

    fn cancel_until(&mut self, level: DecisionLevel) {
        let top = self.formula.assigns.current_level();
        let heur = &mut self.heur;
        self.formula.assigns.rewind_until_level(level, |lvl, lit| heur.cancel(lit, lvl == top));
    }

    /// Runs 1-UIP analysis on `confl`, backjumps, and installs the result —
    /// the inner arm of the search loop's conflict branch, also reused by
    /// dynamic ingestion's conflicting-clause case.
    fn resolve_conflict(&mut self, confl: ClauseRef) -> bool {
        let conflict = {
            let heur = &mut self.heur;
            let db = &mut self.db;
            self.analyze.analyze(
                &self.formula.assigns,
                &mut self.formula.ca,
                confl,
                |v| heur.bump_activity(&v),
                |ca, cr| db.bump_activity(ca, cr),
            )
        };

        match conflict {
            Conflict::Ground => false,

            Conflict::Unit(level, unit) => {
                self.cancel_until(level);
                try_assign_lit(&mut self.formula.assigns, unit, None);
                true
            }

            Conflict::Learned(level, lit, clause) => {
                self.cancel_until(level);
                let cr = self.db.learn_clause(&mut self.formula.ca, &clause);
                self.formula.attach(cr);
                try_assign_lit(&mut self.formula.assigns, lit, Some(cr));
                true
            }
        }
    }

    fn next_assumption_or_none(&mut self, assumptions: &[Lit]) -> NextAssumption {
        loop {
            let level = self.formula.assigns.current_level().offset();
            if level >= assumptions.len() {
                return NextAssumption::None;
            }

            let p = assumptions[level];
            match self.formula.assigns.of_lit(p) {
                LitVal::True => {
                    // Already implied: keep decision-level bookkeeping aligned
                    // with the assumption list without enqueuing anything.
                    self.formula.assigns.new_decision_level();
                }

                LitVal::False => {
                    let conflict = self.analyze.analyze_final(&self.formula.ca, &self.formula.assigns, !p);
                    return NextAssumption::Conflict(conflict);
                }

                LitVal::Undef => return NextAssumption::Decide(p),
            }
        }
    }

    fn search_loop(
        &mut self,
        nof_conflicts: u64,
        budget: &Budget,
        guard: &mut LearningGuard,
        mut propagator: Option<&mut PropagatorPort>,
        assumptions: &[Lit],
    ) -> LoopRes {
        let mut round_conflicts = 0u64;

        loop {
            match self.formula.propagate() {
                Some(confl) => {
                    self.stats.conflicts += 1;
                    round_conflicts += 1;

                    if !self.resolve_conflict(confl) {
                        self.ok = false;
                        return LoopRes::UnSAT;
                    }

                    self.heur.decay_activity();
                    self.db.decay_activity();
                    guard.bump();

                    if self.stats.conflicts % 5000 == 0 {
                        log::debug!(
                            "conflicts: {:>9} | learnts: {:>8} | progress: {:>6.2}%",
                            self.stats.conflicts,
                            self.db.number_of_learnts(),
                            progress_estimate(&self.formula.assigns) * 100.0
                        );
                    }
                }

                None => {
                    if !budget.within(self.stats.conflicts, self.formula.propagations()) {
                        let progress = progress_estimate(&self.formula.assigns);
                        self.cancel_until(GROUND_LEVEL);
                        return LoopRes::Interrupted(progress);
                    }

                    if round_conflicts >= nof_conflicts {
                        self.cancel_until(GROUND_LEVEL);
                        return LoopRes::Restart;
                    }

                    if self.formula.is_ground_level() && !self.simplify() {
                        return LoopRes::UnSAT;
                    }

                    if (self.db.number_of_learnts() as f64) - (self.formula.assigns.number_of_assigns() as f64)
                        >= guard.max_learnts()
                    {
                        self.reduce_db();
                    }

                    if let Some(port) = propagator.as_deref_mut() {
                        match port.consult(self) {
                            PropagatorVerdict::Unsat => {
                                self.ok = false;
                                return LoopRes::UnSAT;
                            }
                            PropagatorVerdict::Retry => continue,
                            PropagatorVerdict::Continue => {}
                        }
                    }

                    match self.next_assumption_or_none(assumptions) {
                        NextAssumption::Conflict(conflict) => return LoopRes::AssumpsConfl(conflict),
                        NextAssumption::Decide(lit) => self.formula.push_decision(lit),
                        NextAssumption::None => match self.heur.pick_branch_lit(&self.formula.assigns) {
                            Some(lit) => {
                                self.stats.decisions += 1;
                                self.formula.push_decision(lit);
                            }
                            None => return LoopRes::SAT,
                        },
                    }
                }
            }
        }
    }

    /// Runs to completion (SAT/UNSAT) or until `budget` cuts the search off,
    /// restarting according to `ss.restart` and widening the learnt-clause
    /// ceiling according to `ss.learn`. `propagator`, if given, is consulted
    /// at every stabilised node.
    pub fn solve(
        mut self,
        ss: &SearchSettings,
        budget: &Budget,
        mut propagator: Option<&mut PropagatorPort>,
        assumptions: &[Lit],
    ) -> SolveRes<Searcher> {
        self.stats.solves += 1;

        if !self.preprocess() {
            return SolveRes::UnSAT(self.sat_stats());
        }

        let mut guard = LearningGuard::new(&ss.learn);
        guard.reset(self.number_of_clauses());

        let mut curr_restarts = 0u32;
        loop {
            let rest_base = if ss.restart.luby_restart {
                luby::luby(ss.restart.restart_inc, curr_restarts)
            } else {
                ss.restart.restart_inc.powi(curr_restarts as i32)
            };
            let nof_conflicts = (rest_base * ss.restart.restart_first) as u64;

            self.stats.starts += 1;
            match self.search_loop(nof_conflicts, budget, &mut guard, propagator.as_deref_mut(), assumptions) {
                LoopRes::Restart => {
                    curr_restarts += 1;
                }

                LoopRes::UnSAT => return SolveRes::UnSAT(self.sat_stats()),

                LoopRes::SAT => {
                    let mut model = Vec::with_capacity(self.number_of_vars());
                    for i in 0..self.number_of_vars() {
                        let v = Var::from_index(i);
                        model.push(v.sign_lit(self.formula.assigns.is_assigned_pos(v.pos_lit())));
                    }
                    self.cancel_until(GROUND_LEVEL);
                    let stats = self.sat_stats();
                    return SolveRes::SAT(model, stats);
                }

                LoopRes::Interrupted(progress) => {
                    return SolveRes::Interrupted(progress, self);
                }

                LoopRes::AssumpsConfl(_) => {
                    self.cancel_until(GROUND_LEVEL);
                    return SolveRes::UnSAT(self.sat_stats());
                }
            }
        }
    }
}
