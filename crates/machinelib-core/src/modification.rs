use crate::snapshot::{SnapshotJournal, SnapshotParticipant, update_snapshots};
use crate::transaction::Transaction;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Counts modifications and propagates them to a parent tracker.
///
/// Slots report to their group's tracker, groups to their storage's tracker.
/// Each mark bumps the counter by one. Under a transaction the counter is
/// journaled, so an abort restores it exactly, and the listener fires once
/// when the outer transaction commits rather than once per change. Without a
/// transaction the listener fires immediately.
pub struct ModificationTracker {
    count: Cell<i64>,
    parent: Option<Rc<ModificationTracker>>,
    listener: RefCell<Option<Rc<dyn Fn()>>>,
    journal: SnapshotJournal<i64>,
}

impl ModificationTracker {
    /// Create a root tracker with nothing counted.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::build(None))
    }

    /// Create a tracker that forwards every mark to `parent`.
    pub fn with_parent(parent: &Rc<ModificationTracker>) -> Rc<Self> {
        Rc::new(Self::build(Some(Rc::clone(parent))))
    }

    fn build(parent: Option<Rc<ModificationTracker>>) -> Self {
        Self {
            count: Cell::new(0),
            parent,
            listener: RefCell::new(None),
            journal: SnapshotJournal::new(),
        }
    }

    /// Number of modifications counted so far.
    pub fn modifications(&self) -> i64 {
        self.count.get()
    }

    /// Install the change listener, replacing any previous one.
    pub fn set_listener(&self, listener: impl Fn() + 'static) {
        *self.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn clear_listener(&self) {
        self.listener.borrow_mut().take();
    }

    /// Record one modification here and in every ancestor.
    pub fn mark_modified(self: &Rc<Self>, transaction: Option<&Transaction<'_>>) {
        match transaction {
            Some(tx) => {
                update_snapshots(self, tx);
                self.count.set(self.count.get() + 1);
            }
            None => {
                self.count.set(self.count.get() + 1);
                self.notify();
            }
        }
        if let Some(parent) = &self.parent {
            parent.mark_modified(transaction);
        }
    }

    fn notify(&self) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

impl SnapshotParticipant for ModificationTracker {
    type Snapshot = i64;

    fn journal(&self) -> &SnapshotJournal<i64> {
        &self.journal
    }

    fn create_snapshot(&self) -> i64 {
        self.count.get()
    }

    fn read_snapshot(&self, snapshot: i64) {
        self.count.set(snapshot);
    }

    fn on_final_commit(&self) {
        self.notify();
    }
}

impl fmt::Debug for ModificationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModificationTracker")
            .field("count", &self.count.get())
            .field("has_parent", &self.parent.is_some())
            .field("has_listener", &self.listener.borrow().is_some())
            .finish()
    }
}
