use crate::sat::formula::{assignment::*, clause::*, Lit, Var};
use super::watches::Watches;


pub struct BacktrackableFormula {
    pub ca: ClauseAllocator,
    pub assigns: Assignment, // The current assignments.
    pub watches: Watches     // 'watches[lit]' is a list of constraints watching 'lit' (will go there if literal becomes true).
}

impl BacktrackableFormula {
    pub fn new() -> Self {
        BacktrackableFormula {
            ca: ClauseAllocator::new_empty(),
            assigns: Assignment::new(),
            watches: Watches::new()
        }
    }

    pub fn new_var(&mut self) -> Var {
        let v = self.assigns.new_var();
        self.watches.init_var(v);
        v
    }


    pub fn attach(&mut self, cr: ClauseRef) {
        let c = self.ca.view(cr);
        self.watches.watch_clause(c, cr);
    }

    pub fn force_detach(&mut self, cr: ClauseRef) {
        self.watches.unwatch_clause_strict(self.ca.view(cr), cr);
    }

    pub fn lazy_detach(&mut self, cr: ClauseRef) {
        self.watches.unwatch_clause_lazy(self.ca.view(cr));
    }

    pub fn try_clear_var(&mut self, v: Var) {
        self.watches.try_clear_var(v);
    }


    pub fn propagations(&self) -> u64 {
        self.watches.propagations
    }

    pub fn propagate(&mut self) -> Option<ClauseRef> {
        self.watches.propagate(&mut self.ca, &mut self.assigns)
    }


    pub fn is_ground_level(&self) -> bool {
        self.assigns.current_level().is_ground()
    }

    pub fn push_decision(&mut self, next: Lit) {
        // Increase decision level and enqueue 'next'
        self.assigns.new_decision_level();
        self.assigns.assign_lit(next, None);
    }


    pub fn reloc_gc(&mut self, to: &mut ClauseAllocator) {
        self.watches.reloc_gc(&mut self.ca, to);
        self.assigns.reloc_gc(&mut self.ca, to);
    }
}