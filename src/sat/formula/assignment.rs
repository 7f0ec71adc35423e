use std::{cmp, fmt};
use super::clause;
use super::{Lit, Var};


/// A decision level; `GROUND_LEVEL` is the root (no open decisions).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DecisionLevel(usize);

pub const GROUND_LEVEL: DecisionLevel = DecisionLevel(0);

impl DecisionLevel {
    #[inline]
    pub fn from_offset(offset: usize) -> DecisionLevel {
        DecisionLevel(offset)
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.0
    }

    #[inline]
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }
}


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u8)]
pub enum LitVal {
    Undef,
    False,
    True,
}

impl LitVal {
    #[inline]
    pub fn is_undef(&self) -> bool {
        *self == LitVal::Undef
    }
}


/// Everything conflict analysis and backjumping need about an assigned variable.
pub struct VarData {
    pub reason: Option<clause::ClauseRef>,
    pub level: DecisionLevel,
}


struct VarLine {
    assign: [LitVal; 2],
    vd: VarData,
}


/// The trail: an ordered sequence of assigned literals with decision-level
/// boundaries (`lim`), plus a propagation queue cursor (`qhead`).
pub struct Assignment {
    assignment: Vec<VarLine>,
    free_vars: Vec<Var>,
    trail: Vec<Lit>,
    lim: Vec<usize>,
    qhead: usize,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment {
            assignment: Vec::new(),
            free_vars: Vec::new(),
            trail: Vec::new(),
            lim: Vec::new(),
            qhead: 0,
        }
    }

    #[inline]
    pub fn number_of_vars(&self) -> usize {
        self.assignment.len()
    }

    #[inline]
    pub fn number_of_assigns(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn number_of_ground_assigns(&self) -> usize {
        match self.lim.first() {
            Some(&lim) => lim,
            None => self.trail.len(),
        }
    }

    pub fn new_var(&mut self) -> Var {
        let line = VarLine {
            assign: [LitVal::Undef, LitVal::Undef],
            vd: VarData {
                reason: None,
                level: GROUND_LEVEL,
            },
        };

        match self.free_vars.pop() {
            Some(var) => {
                self.assignment[var.index()] = line;
                var
            }

            None => {
                self.assignment.push(line);
                Var::from_index(self.assignment.len() - 1)
            }
        }
    }

    /// Returns a variable to the free-list so a later `new_var` can recycle its slot.
    /// The variable must be currently unassigned.
    pub fn release_var(&mut self, v: Var) {
        assert!(self.is_undef(v));
        self.free_vars.push(v);
    }

    #[inline]
    pub fn current_level(&self) -> DecisionLevel {
        DecisionLevel(self.lim.len())
    }

    #[inline]
    pub fn new_decision_level(&mut self) {
        self.lim.push(self.trail.len());
    }

    #[inline]
    pub fn assign_lit(&mut self, lit: Lit, reason: Option<clause::ClauseRef>) {
        let line = &mut self.assignment[lit.var_index()];

        assert!(line.assign[0].is_undef());
        line.assign[lit.sign_index()] = LitVal::True;
        line.assign[lit.sign_index() ^ 1] = LitVal::False;
        line.vd.level = DecisionLevel(self.lim.len());
        line.vd.reason = reason;
        self.trail.push(lit);
    }

    /// Undoes every assignment made at or above `target_level`, calling `f` with the
    /// decision level the literal was assigned at and the literal itself (for phase
    /// saving / order-heap reinsertion), then truncates the trail and `qhead`.
    #[inline]
    pub fn rewind_until_level<F: FnMut(DecisionLevel, Lit) -> ()>(
        &mut self,
        DecisionLevel(target_level): DecisionLevel,
        mut f: F,
    ) {
        while self.lim.len() > target_level {
            let level = self.trail.len();
            let bottom = self.lim.pop().unwrap();
            while self.trail.len() > bottom {
                let lit = self.trail.pop().unwrap();

                f(DecisionLevel(level), lit);

                let line = &mut self.assignment[lit.var_index()];
                line.assign = [LitVal::Undef, LitVal::Undef];
                line.vd.reason = None;
            }
        }

        self.qhead = cmp::min(self.qhead, self.trail.len());
    }

    /// Trail literals assigned strictly above `target_level`, in assignment order.
    #[inline]
    pub fn trail_above(&self, DecisionLevel(target_level): DecisionLevel) -> &[Lit] {
        if self.lim.len() > target_level {
            &self.trail[self.lim[target_level]..]
        } else {
            &[]
        }
    }

    /// Drops trail entries (at ground level only) for which `f` returns false —
    /// used by `simplify` to compact out released variables.
    #[inline]
    pub fn retain_assignments<F: Fn(&Lit) -> bool>(&mut self, f: F) {
        assert!(self.current_level().is_ground());
        self.trail.retain(f);
        self.qhead = self.trail.len();
    }

    #[inline]
    pub fn dequeue_all(&mut self) {
        self.qhead = self.trail.len()
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    #[inline]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    #[inline]
    pub fn is_undef(&self, var: Var) -> bool {
        self.assignment[var.index()].assign[0].is_undef()
    }

    #[inline]
    pub fn is_assigned_pos(&self, p: Lit) -> bool {
        self.of_lit(p) == LitVal::True
    }

    #[inline]
    pub fn is_assigned_neg(&self, p: Lit) -> bool {
        self.of_lit(p) == LitVal::False
    }

    #[inline]
    pub fn of_lit(&self, lit: Lit) -> LitVal {
        unsafe {
            *self
                .assignment
                .get_unchecked(lit.var_index())
                .assign
                .get_unchecked(lit.sign_index())
        }
    }

    /// Level/reason of the variable underlying `lit`. `lit` must currently be false
    /// (the usual case: a literal drawn from a clause that is falsified or being
    /// resolved during conflict analysis).
    #[inline]
    pub fn vardata(&self, lit: Lit) -> &VarData {
        let line = &self.assignment[lit.var_index()];
        debug_assert_eq!(line.assign[lit.sign_index()], LitVal::False);
        &line.vd
    }

    #[inline]
    pub fn level_of(&self, var: Var) -> DecisionLevel {
        self.assignment[var.index()].vd.level
    }

    #[inline]
    pub fn reason_of(&self, var: Var) -> Option<clause::ClauseRef> {
        self.assignment[var.index()].vd.reason
    }

    pub fn reloc_gc(&mut self, from: &mut clause::ClauseAllocator, to: &mut clause::ClauseAllocator) {
        for lit in self.trail.iter() {
            let reason = &mut self.assignment[lit.var_index()].vd.reason;
            *reason = reason.map(|cr| from.reloc_to(to, cr));
        }
    }

    /// A clause is locked iff it is the reason for the assignment of its own
    /// first (watched) literal and that literal is currently true — such a
    /// clause must survive a GC/`reduceDB` sweep even if otherwise eligible.
    pub fn is_locked(&self, ca: &clause::ClauseAllocator, cr: clause::ClauseRef) -> bool {
        let lit = ca.view(cr).head()[0];
        let line = &self.assignment[lit.var_index()];
        if line.assign[lit.sign_index()] == LitVal::True {
            line.vd.reason == Some(cr)
        } else {
            false
        }
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for level in 0..1 + self.lim.len() {
            let l = if level > 0 { self.lim[level - 1] } else { 0 };
            let r = if level < self.lim.len() {
                self.lim[level]
            } else {
                self.trail.len()
            };

            if r > l {
                write!(f, "[{}:", level)?;
                for lit in self.trail[l..r].iter() {
                    write!(f, " {:?}", lit)?;
                }
                write!(f, " ]")?;
            }
        }

        Ok(())
    }
}

/// A rough fraction of the search space already decided, weighted so that
/// deeper levels count for exponentially less. Used only for progress logging.
pub fn progress_estimate(assigns: &Assignment) -> f64 {
    let f = 1.0 / (assigns.number_of_vars() as f64);
    let mut progress = 0.0;

    let cl = assigns.lim.len();
    for level in 0..cl + 1 {
        let l = if level == 0 { 0 } else { assigns.lim[level - 1] };
        let r = if level == cl {
            assigns.trail.len()
        } else {
            assigns.lim[level]
        };
        progress += f.powi(level as i32) * ((r - l) as f64);
    }
    progress * f
}

pub fn try_assign_lit(assigns: &mut Assignment, p: Lit, from: Option<clause::ClauseRef>) -> bool {
    match assigns.of_lit(p) {
        LitVal::True => true,
        LitVal::False => false,
        LitVal::Undef => {
            assigns.assign_lit(p, from);
            true
        }
    }
}
