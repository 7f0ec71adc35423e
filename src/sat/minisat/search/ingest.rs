//! Attaches a clause produced by an external oracle mid-search, at whatever
//! decision level the trail happens to be at — as opposed to `Searcher::add_clause`,
//! which only ever runs at the ground level.
//!
//! The clause's literals are partitioned into undefined ones and assigned
//! ones (the latter ordered by descending decision level), then one of a
//! handful of cases below decides how to backjump and what, if anything, to
//! enqueue or re-derive through ordinary conflict analysis.

use crate::sat::formula::{assignment::*, Lit};
use super::Searcher;

pub enum IngestResult {
    Ok,
    UnsatAtRoot,
}

pub fn add_clause_during_search(searcher: &mut Searcher, literals: &[Lit]) -> IngestResult {
    if literals.is_empty() {
        return IngestResult::UnsatAtRoot;
    }

    let mut c = literals.to_vec();
    {
        let assigns = &searcher.formula.assigns;
        c.sort_by(|&a, &b| {
            use std::cmp::Ordering;
            match (assigns.of_lit(a), assigns.of_lit(b)) {
                (LitVal::Undef, LitVal::Undef) => Ordering::Equal,
                (LitVal::Undef, _) => Ordering::Less,
                (_, LitVal::Undef) => Ordering::Greater,
                _ => assigns.level_of(b.var()).cmp(&assigns.level_of(a.var())),
            }
        });
    }

    let k = c.len();

    if k == 1 {
        // A unit clause needs no second watch: either it's already true, or
        // it must be forced true at the ground level (undoing whatever
        // decision chain made it false, unless that false assignment
        // already sits at the ground level, which is a root conflict).
        return match searcher.formula.assigns.of_lit(c[0]) {
            LitVal::True => IngestResult::Ok,

            LitVal::False if searcher.formula.assigns.level_of(c[0].var()).is_ground() => {
                IngestResult::UnsatAtRoot
            }

            _ => {
                searcher.cancel_until(GROUND_LEVEL);
                try_assign_lit(&mut searcher.formula.assigns, c[0], None);
                IngestResult::Ok
            }
        };
    }

    let u = c.iter().take_while(|&&l| searcher.formula.assigns.of_lit(l) == LitVal::Undef).count();

    if u >= 2 {
        // At least two literals are still undefined: nothing is implied or
        // falsified yet, so attach like an ordinary clause, watching the two
        // undefined literals sorted to the front.
        let cr = searcher.db.add_clause(&mut searcher.formula.ca, &c);
        searcher.formula.attach(cr);
        return IngestResult::Ok;
    }

    let h = searcher.formula.assigns.level_of(c[u].var());

    if u == 0 && h.is_ground() {
        return IngestResult::UnsatAtRoot;
    }

    if u == 1 {
        searcher.cancel_until(h);
        let cr = searcher.db.add_clause(&mut searcher.formula.ca, &c);
        searcher.formula.attach(cr);
        for &lit in c.iter() {
            searcher.heur.bump_activity(&lit.var());
        }
        try_assign_lit(&mut searcher.formula.assigns, c[0], Some(cr));
        return IngestResult::Ok;
    }

    // u == 0: every literal is already assigned and c[0] sits at the
    // highest level present, h.
    let m = c.iter().take_while(|&&l| searcher.formula.assigns.level_of(l.var()) == h).count();

    if m > 1 {
        // More than one literal at the top level: a genuine conflicting
        // clause. Install it as an original clause first (it did come from
        // the oracle, not from resolution), then run ordinary 1-UIP
        // analysis/backjump/learn on it like any other conflict.
        searcher.cancel_until(h);
        let cr = searcher.db.add_clause(&mut searcher.formula.ca, &c);
        searcher.formula.attach(cr);
        if !searcher.resolve_conflict(cr) {
            return IngestResult::UnsatAtRoot;
        }
        IngestResult::Ok
    } else {
        // Exactly one literal at the top level: the clause is already
        // asserting once the trail is rewound just past the next-highest
        // level (c[1]'s).
        let target = searcher.formula.assigns.level_of(c[1].var());
        searcher.cancel_until(target);
        let cr = searcher.db.add_clause(&mut searcher.formula.ca, &c);
        searcher.formula.attach(cr);
        try_assign_lit(&mut searcher.formula.assigns, c[0], Some(cr));
        IngestResult::Ok
    }
}
