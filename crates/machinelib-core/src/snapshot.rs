//! Snapshot-based transaction participation.
//!
//! A participant keeps at most one snapshot per nesting depth in its
//! [`SnapshotJournal`]. The first mutation inside a transaction takes a
//! snapshot; later mutations at the same depth reuse it. On abort the
//! snapshot is restored. On a nested commit it moves to the parent unless
//! the parent already holds an older one. On the outer commit it is
//! dropped and [`SnapshotParticipant::on_final_commit`] is scheduled.

use crate::transaction::{CloseContext, Transaction, TransactionResult};
use std::cell::RefCell;
use std::rc::Rc;

/// Per-depth snapshot storage owned by a participant.
#[derive(Debug)]
pub struct SnapshotJournal<S> {
    snapshots: RefCell<Vec<Option<S>>>,
}

impl<S> Default for SnapshotJournal<S> {
    fn default() -> Self {
        Self {
            snapshots: RefCell::new(Vec::new()),
        }
    }
}

impl<S> SnapshotJournal<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot is held at any depth.
    pub fn is_pending(&self) -> bool {
        self.snapshots.borrow().iter().any(Option::is_some)
    }

    fn has(&self, depth: usize) -> bool {
        self.snapshots
            .borrow()
            .get(depth)
            .is_some_and(Option::is_some)
    }

    fn put(&self, depth: usize, snapshot: S) {
        let mut snapshots = self.snapshots.borrow_mut();
        if snapshots.len() <= depth {
            snapshots.resize_with(depth + 1, || None);
        }
        snapshots[depth] = Some(snapshot);
    }

    fn take(&self, depth: usize) -> Option<S> {
        self.snapshots
            .borrow_mut()
            .get_mut(depth)
            .and_then(Option::take)
    }
}

/// State that can be rolled back by restoring a snapshot.
pub trait SnapshotParticipant: 'static {
    type Snapshot: 'static;

    fn journal(&self) -> &SnapshotJournal<Self::Snapshot>;

    fn create_snapshot(&self) -> Self::Snapshot;

    fn read_snapshot(&self, snapshot: Self::Snapshot);

    /// Runs after the outer transaction that included a change has committed.
    fn on_final_commit(&self) {}
}

/// Record the participant's current state for `transaction`, if not already
/// recorded at this depth. Call before every mutation made under a transaction.
pub fn update_snapshots<P: SnapshotParticipant>(participant: &Rc<P>, transaction: &Transaction<'_>) {
    let depth = transaction.nesting_depth();
    if participant.journal().has(depth) {
        return;
    }
    let snapshot = participant.create_snapshot();
    participant.journal().put(depth, snapshot);

    let participant = Rc::clone(participant);
    transaction.add_close_callback(move |ctx, result| on_close(participant, ctx, result));
}

fn on_close<P: SnapshotParticipant>(
    participant: Rc<P>,
    ctx: &CloseContext<'_>,
    result: TransactionResult,
) {
    let depth = ctx.nesting_depth();
    let Some(snapshot) = participant.journal().take(depth) else {
        return;
    };

    match result {
        TransactionResult::Aborted => participant.read_snapshot(snapshot),
        TransactionResult::Committed if depth > 0 => {
            let journal = participant.journal();
            if !journal.has(depth - 1) {
                journal.put(depth - 1, snapshot);
                ctx.add_parent_close_callback(move |ctx, result| {
                    on_close(participant, ctx, result)
                });
            }
        }
        TransactionResult::Committed => {
            ctx.add_outer_close_callback(move |result| {
                if result.was_committed() {
                    participant.on_final_commit();
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        value: Cell<i32>,
        commits: Cell<u32>,
        journal: SnapshotJournal<i32>,
    }

    impl SnapshotParticipant for Counter {
        type Snapshot = i32;

        fn journal(&self) -> &SnapshotJournal<i32> {
            &self.journal
        }

        fn create_snapshot(&self) -> i32 {
            self.value.get()
        }

        fn read_snapshot(&self, snapshot: i32) {
            self.value.set(snapshot);
        }

        fn on_final_commit(&self) {
            self.commits.set(self.commits.get() + 1);
        }
    }

    fn add(counter: &Rc<Counter>, n: i32, tx: &Transaction<'_>) {
        update_snapshots(counter, tx);
        counter.value.set(counter.value.get() + n);
    }

    #[test]
    fn abort_restores() {
        let c = Rc::new(Counter::default());
        let tx = Transaction::open_outer();
        add(&c, 5, &tx);
        add(&c, 5, &tx);
        assert_eq!(c.value.get(), 10);
        tx.abort();
        assert_eq!(c.value.get(), 0);
        assert!(!c.journal.is_pending());
    }

    #[test]
    fn commit_keeps_and_notifies_once() {
        let c = Rc::new(Counter::default());
        let tx = Transaction::open_outer();
        add(&c, 3, &tx);
        add(&c, 4, &tx);
        tx.commit();
        assert_eq!(c.value.get(), 7);
        assert_eq!(c.commits.get(), 1);
    }

    #[test]
    fn nested_commit_then_outer_abort_restores_original() {
        let c = Rc::new(Counter::default());
        let mut outer = Transaction::open_outer();
        {
            let inner = outer.open_nested();
            add(&c, 8, &inner);
            inner.commit();
        }
        assert_eq!(c.value.get(), 8);
        outer.abort();
        assert_eq!(c.value.get(), 0);
        assert_eq!(c.commits.get(), 0);
    }

    #[test]
    fn nested_abort_only_rolls_back_child() {
        let c = Rc::new(Counter::default());
        let mut outer = Transaction::open_outer();
        add(&c, 1, &outer);
        {
            let inner = outer.open_nested();
            add(&c, 10, &inner);
            inner.abort();
        }
        assert_eq!(c.value.get(), 1);
        outer.commit();
        assert_eq!(c.value.get(), 1);
        assert_eq!(c.commits.get(), 1);
    }

    #[test]
    fn nested_commit_keeps_parent_snapshot() {
        let c = Rc::new(Counter::default());
        let mut outer = Transaction::open_outer();
        add(&c, 2, &outer);
        {
            let inner = outer.open_nested();
            add(&c, 3, &inner);
            inner.commit();
        }
        assert_eq!(c.value.get(), 5);
        outer.abort();
        assert_eq!(c.value.get(), 0);
    }

    #[test]
    fn deep_nesting_moves_snapshot_through_levels() {
        let c = Rc::new(Counter::default());
        let mut outer = Transaction::open_outer();
        {
            let mut mid = outer.open_nested();
            {
                let deep = mid.open_nested();
                add(&c, 6, &deep);
                deep.commit();
            }
            mid.commit();
        }
        assert_eq!(c.value.get(), 6);
        outer.commit();
        assert_eq!(c.value.get(), 6);
        assert_eq!(c.commits.get(), 1);
    }
}
