use std::mem;
use crate::sat::formula::{assignment::*, clause::*, LitMap, Lit, Var};


/// An entry in a literal's watch list: the clause being watched, plus a
/// cached literal from that clause (not necessarily one of the two watched
/// ones) that lets propagation skip the clause without touching memory when
/// the blocker is already true.
#[derive(Clone, Copy)]
struct Watcher {
    cref: ClauseRef,
    blocker: Lit,
}

#[derive(Default)]
struct WatchesLine {
    watchers: Vec<Watcher>,
    dirty: bool,
}

impl WatchesLine {
    fn clean_dirty(&mut self, ca: &ClauseAllocator) {
        if self.dirty {
            self.watchers.retain(|w| !ca.is_deleted(w.cref));
            self.dirty = false;
        }
    }
}


/// Two-watched-literal index: for each literal, the clauses that would need
/// attention if that literal became true. `propagations` is a running count
/// used for statistics and the budget.
pub struct Watches {
    watches: LitMap<WatchesLine>,
    pub propagations: u64,
}

impl Watches {
    pub fn new() -> Self {
        Watches { watches: LitMap::new(), propagations: 0 }
    }

    pub fn init_var(&mut self, v: Var) {
        self.watches.insert(&v.pos_lit(), WatchesLine::default());
        self.watches.insert(&v.neg_lit(), WatchesLine::default());
    }

    /// Drops a variable's watch lines once they're both empty — used when a
    /// variable is released back to the assignment's free list.
    pub fn try_clear_var(&mut self, v: Var) {
        if self.watches[&v.pos_lit()].watchers.is_empty() && self.watches[&v.neg_lit()].watchers.is_empty() {
            self.watches.remove(&v.pos_lit());
            self.watches.remove(&v.neg_lit());
        }
    }

    pub fn watch_clause(&mut self, c: &Clause, cr: ClauseRef) {
        let head = c.head();
        self.watches[&!head[0]].watchers.push(Watcher { cref: cr, blocker: head[1] });
        self.watches[&!head[1]].watchers.push(Watcher { cref: cr, blocker: head[0] });
    }

    /// Removes `cr` from its watch lists immediately. Used when the caller
    /// already holds `&mut Clause` and is about to free it outright.
    pub fn unwatch_clause_strict(&mut self, c: &Clause, cr: ClauseRef) {
        let head = c.head();
        self.watches[&!head[0]].watchers.retain(|w| w.cref != cr);
        self.watches[&!head[1]].watchers.retain(|w| w.cref != cr);
    }

    /// Marks the watch lines holding `cr` as dirty instead of scanning them
    /// now; `propagate`/GC lazily drop dead entries the next time they walk
    /// that line. Cheaper when many clauses are detached in a burst.
    pub fn unwatch_clause_lazy(&mut self, c: &Clause) {
        let head = c.head();
        self.watches[&!head[0]].dirty = true;
        self.watches[&!head[1]].dirty = true;
    }

    /// Unit-propagates every literal currently queued in `assigns`, watching
    /// clauses as the two-literal scheme requires, until the queue is empty
    /// or a clause is falsified. Returns the falsified clause, if any.
    pub fn propagate(&mut self, ca: &mut ClauseAllocator, assigns: &mut Assignment) -> Option<ClauseRef> {
        while let Some(p) = assigns.dequeue() {
            self.propagations += 1;

            // Take the line out so we can freely push moved watchers into
            // other literals' lines without aliasing this one.
            let mut line = mem::take(&mut self.watches[&p]);
            line.clean_dirty(ca);

            let mut kept = Vec::with_capacity(line.watchers.len());
            let mut conflict = None;
            let mut i = 0;

            while i < line.watchers.len() {
                let watcher = line.watchers[i];
                i += 1;

                if assigns.is_assigned_pos(watcher.blocker) {
                    kept.push(watcher);
                    continue;
                }

                let c = ca.edit(watcher.cref);
                let head = c.head();
                let false_watch_index = if head[0] == !p { 0 } else { 1 };
                let other = head[1 - false_watch_index];

                if assigns.is_assigned_pos(other) {
                    kept.push(Watcher { cref: watcher.cref, blocker: other });
                    continue;
                }

                // Put the falsified watch at index 1 so a found replacement
                // lands in the head (index 0 keeps `other`).
                if false_watch_index == 0 {
                    c.swap(0, 1);
                }

                match c.pull_literal(1, |lit| !assigns.is_assigned_neg(lit)) {
                    Some(new_watch) => {
                        self.watches[&!new_watch]
                            .watchers
                            .push(Watcher { cref: watcher.cref, blocker: other });
                    }

                    None => {
                        // No substitute watch: `other` becomes unit, unless it's already false.
                        kept.push(Watcher { cref: watcher.cref, blocker: other });

                        if assigns.is_assigned_neg(other) {
                            conflict = Some(watcher.cref);
                            kept.extend_from_slice(&line.watchers[i..]);
                            break;
                        } else {
                            assigns.assign_lit(other, Some(watcher.cref));
                        }
                    }
                }
            }

            line.watchers = kept;
            self.watches[&p] = line;

            if let Some(cr) = conflict {
                assigns.dequeue_all();
                return Some(cr);
            }
        }

        None
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for (_, line) in self.watches.iter_mut() {
            line.watchers.retain(|w| !from.is_deleted(w.cref));
            for w in line.watchers.iter_mut() {
                w.cref = from.reloc_to(to, w.cref);
            }
            line.dirty = false;
        }
    }
}
