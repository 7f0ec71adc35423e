use std::cmp::Ordering;
use crate::sat::formula::{assignment::Assignment, clause::*, util::satisfied_with_assignment, Lit};


pub struct ClauseDBSettings {
    /// Whether to pay for a linear scan over original clauses for satisfied
    /// ones in `remove_satisfied`, not just learnt ones.
    pub remove_satisfied: bool,
    pub clause_decay: f64,
}

impl Default for ClauseDBSettings {
    fn default() -> ClauseDBSettings {
        ClauseDBSettings {
            remove_satisfied: true,
            clause_decay: 0.999,
        }
    }
}


#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
}

impl Stats {
    fn add(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts += 1;
            self.learnts_literals += clause.len() as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += clause.len() as u64;
        }
    }

    fn del(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts -= 1;
            self.learnts_literals -= clause.len() as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= clause.len() as u64;
        }
    }
}


/// Bookkeeping layered on top of `ClauseAllocator`: which clauses are
/// "original" vs. learnt, their activity-based decay, and `reduce`/GC.
pub struct ClauseDB {
    pub settings: ClauseDBSettings,
    cla_inc: f64,
    clauses: Vec<ClauseRef>,
    learnts: Vec<ClauseRef>,
    pub stats: Stats,
}

impl ClauseDB {
    pub fn new(settings: ClauseDBSettings) -> ClauseDB {
        ClauseDB {
            settings,
            cla_inc: 1.0,
            clauses: Vec::new(),
            learnts: Vec::new(),
            stats: Stats::default(),
        }
    }

    pub fn add_clause(&mut self, ca: &mut ClauseAllocator, literals: &[Lit]) -> ClauseRef {
        let cr = ca.alloc(literals, false);
        self.stats.add(ca.view(cr));
        self.clauses.push(cr);
        cr
    }

    pub fn learn_clause(&mut self, ca: &mut ClauseAllocator, literals: &[Lit]) -> ClauseRef {
        let cr = ca.alloc(literals, true);
        self.stats.add(ca.view(cr));
        self.learnts.push(cr);
        self.bump_activity(ca, cr);
        cr
    }

    pub fn remove_clause(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        self.stats.del(ca.view(cr));
        ca.free(cr);
    }

    pub fn bump_activity(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        if !ca.view(cr).is_learnt() {
            return;
        }

        let new = ca.view(cr).activity() + self.cla_inc;
        ca.edit(cr).set_activity(new);

        if new > 1e20 {
            self.cla_inc *= 1e-20;
            for &cri in self.learnts.iter() {
                let scaled = ca.view(cri).activity() * 1e-20;
                ca.edit(cri).set_activity(scaled);
            }
        }
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.settings.clause_decay;
    }

    pub fn number_of_learnts(&self) -> usize {
        self.learnts.len()
    }

    /// Deletes half the learnt clauses (by size-then-activity order), never
    /// touching binary clauses or ones locked by the current trail.
    pub fn reduce<F: FnMut(&Clause)>(&mut self, ca: &mut ClauseAllocator, assigns: &Assignment, mut notify: F) {
        self.learnts.sort_by(|&rx, &ry| {
            let x = ca.view(rx);
            let y = ca.view(ry);

            if x.len() == 2 && y.len() == 2 {
                Ordering::Equal
            } else if x.len() == 2 {
                Ordering::Greater
            } else if y.len() == 2 {
                Ordering::Less
            } else {
                x.activity().partial_cmp(&y.activity()).unwrap()
            }
        });

        let index_lim = self.learnts.len() / 2;
        let extra_lim = self.cla_inc / self.learnts.len() as f64;
        let stats = &mut self.stats;

        let mut i = 0;
        self.learnts.retain(|&cr| {
            if ca.is_deleted(cr) {
                i += 1;
                return false;
            }

            let remove = {
                let c = ca.view(cr);
                c.len() > 2
                    && !assigns.is_locked(ca, cr)
                    && (i < index_lim || c.activity() < extra_lim)
            };

            if remove {
                notify(ca.view(cr));
                stats.del(ca.view(cr));
                ca.free(cr);
            }

            i += 1;
            !remove
        });
    }

    fn retain_clause<F: FnMut(&Clause)>(
        stats: &mut Stats,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        notify: &mut F,
        cr: ClauseRef,
    ) -> bool {
        if ca.is_deleted(cr) {
            false
        } else if satisfied_with_assignment(ca.view(cr).lits(), assigns) {
            notify(ca.view(cr));
            stats.del(ca.view(cr));
            ca.free(cr);
            false
        } else {
            let ground = assigns.current_level().is_ground();
            debug_assert!(ground, "remove_satisfied only valid at the ground level");
            ca.edit(cr).retain(|lit| !assigns.is_assigned_neg(lit));
            true
        }
    }

    /// Drops satisfied clauses and strips falsified trailing literals from
    /// the rest. Only valid to call at the ground level.
    pub fn remove_satisfied<F: FnMut(&Clause)>(&mut self, ca: &mut ClauseAllocator, assigns: &Assignment, mut notify: F) {
        let stats = &mut self.stats;
        self.learnts.retain(|&cr| Self::retain_clause(stats, ca, assigns, &mut notify, cr));

        if self.settings.remove_satisfied {
            self.clauses.retain(|&cr| Self::retain_clause(stats, ca, assigns, &mut notify, cr));
        }
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for cr in self.learnts.iter_mut() {
            *cr = from.reloc_to(to, *cr);
        }
        for cr in self.clauses.iter_mut() {
            *cr = from.reloc_to(to, *cr);
        }
    }
}
