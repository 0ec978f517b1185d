//! Nestable transactions with rollback callbacks.
//!
//! A transaction is a scope in which storage mutations are provisional. An
//! outer transaction is opened with [`Transaction::open_outer`]; nested
//! transactions are opened from their parent with
//! [`Transaction::open_nested`], which borrows the parent mutably so the
//! child must close before the parent can be used again. Closing a
//! transaction runs every callback registered on it, in registration order,
//! with the [`TransactionResult`]. Dropping an open transaction aborts it.
//!
//! Only one outer transaction may be open per thread at a time. Opening a
//! second one while the first is still open panics.
//!
//! Participants never implement rollback by hand; they go through
//! [`update_snapshots`](crate::snapshot::update_snapshots), which registers
//! the right callbacks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// How a transaction was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionResult {
    Committed,
    Aborted,
}

impl TransactionResult {
    pub fn was_committed(self) -> bool {
        self == TransactionResult::Committed
    }

    pub fn was_aborted(self) -> bool {
        self == TransactionResult::Aborted
    }
}

/// Callback run when the transaction it was registered on closes.
pub type CloseCallback = Box<dyn FnOnce(&CloseContext<'_>, TransactionResult)>;

/// Callback run after the outermost transaction has fully closed.
pub type OuterCloseCallback = Box<dyn FnOnce(TransactionResult)>;

// ---------------------------------------------------------------------------
// Shared stack
// ---------------------------------------------------------------------------

thread_local! {
    static OUTER_OPEN: Cell<bool> = const { Cell::new(false) };
}

#[derive(Default)]
struct Frame {
    callbacks: Vec<CloseCallback>,
    closing: bool,
}

/// State shared by every level of one transaction stack.
struct Stack {
    frames: RefCell<Vec<Frame>>,
    outer_callbacks: RefCell<Vec<OuterCloseCallback>>,
}

impl Stack {
    fn push_callback(&self, depth: usize, callback: CloseCallback) {
        let mut frames = self.frames.borrow_mut();
        let frame = frames
            .get_mut(depth)
            .unwrap_or_else(|| panic!("no open transaction at depth {depth}"));
        assert!(
            !frame.closing,
            "cannot register a close callback on a transaction that is closing"
        );
        frame.callbacks.push(callback);
    }

    fn push_outer_callback(&self, callback: OuterCloseCallback) {
        self.outer_callbacks.borrow_mut().push(callback);
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An open transaction at some nesting depth.
///
/// `'p` is the borrow of the parent transaction; outer transactions are
/// `Transaction<'static>`.
#[must_use = "a transaction aborts when dropped; call commit() to keep its changes"]
pub struct Transaction<'p> {
    stack: Rc<Stack>,
    depth: usize,
    closed: bool,
    _parent: PhantomData<&'p mut ()>,
}

impl Transaction<'static> {
    /// Open a new outermost transaction (depth 0).
    ///
    /// Panics if this thread already has an open outer transaction.
    pub fn open_outer() -> Self {
        assert!(
            !Self::is_open(),
            "an outer transaction is already open on this thread; open a nested one instead"
        );
        OUTER_OPEN.with(|open| open.set(true));
        let stack = Rc::new(Stack {
            frames: RefCell::new(vec![Frame::default()]),
            outer_callbacks: RefCell::new(Vec::new()),
        });
        Transaction {
            stack,
            depth: 0,
            closed: false,
            _parent: PhantomData,
        }
    }
}

impl Transaction<'_> {
    /// Whether this thread has an open outer transaction.
    pub fn is_open() -> bool {
        OUTER_OPEN.with(Cell::get)
    }
}

impl<'p> Transaction<'p> {
    /// Open a child transaction. The parent is unusable until the child closes.
    pub fn open_nested(&mut self) -> Transaction<'_> {
        {
            let mut frames = self.stack.frames.borrow_mut();
            assert_eq!(
                frames.len(),
                self.depth + 1,
                "nested transaction opened on a transaction that is not the innermost"
            );
            frames.push(Frame::default());
        }
        Transaction {
            stack: Rc::clone(&self.stack),
            depth: self.depth + 1,
            closed: false,
            _parent: PhantomData,
        }
    }

    /// 0 for an outer transaction, parent depth + 1 otherwise.
    pub fn nesting_depth(&self) -> usize {
        self.depth
    }

    /// Keep the changes made in this transaction (provisionally, if nested).
    pub fn commit(mut self) {
        self.close(TransactionResult::Committed);
    }

    /// Roll back every change made in this transaction.
    pub fn abort(mut self) {
        self.close(TransactionResult::Aborted);
    }

    /// Register a callback to run when this transaction closes.
    pub fn add_close_callback(
        &self,
        callback: impl FnOnce(&CloseContext<'_>, TransactionResult) + 'static,
    ) {
        self.stack.push_callback(self.depth, Box::new(callback));
    }

    /// Register a callback to run once the outermost transaction has closed.
    pub fn add_outer_close_callback(&self, callback: impl FnOnce(TransactionResult) + 'static) {
        self.stack.push_outer_callback(Box::new(callback));
    }

    fn close(&mut self, result: TransactionResult) {
        self.closed = true;

        let callbacks = {
            let mut frames = self.stack.frames.borrow_mut();
            assert_eq!(
                frames.len(),
                self.depth + 1,
                "transaction closed while a nested transaction is still open"
            );
            let frame = &mut frames[self.depth];
            frame.closing = true;
            std::mem::take(&mut frame.callbacks)
        };

        let ctx = CloseContext {
            stack: &self.stack,
            depth: self.depth,
        };
        for callback in callbacks {
            callback(&ctx, result);
        }

        self.stack.frames.borrow_mut().pop();

        if self.depth == 0 {
            OUTER_OPEN.with(|open| open.set(false));
            let outer = std::mem::take(&mut *self.stack.outer_callbacks.borrow_mut());
            tracing::debug!(?result, callbacks = outer.len(), "outer transaction closed");
            for callback in outer {
                callback(result);
            }
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if !std::thread::panicking() {
            self.close(TransactionResult::Aborted);
        } else if self.depth == 0 {
            OUTER_OPEN.with(|open| open.set(false));
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("depth", &self.depth)
            .field("closed", &self.closed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Close context
// ---------------------------------------------------------------------------

/// Handed to close callbacks. Lets a callback defer work to the parent
/// transaction or to the end of the outermost one.
pub struct CloseContext<'a> {
    stack: &'a Stack,
    depth: usize,
}

impl CloseContext<'_> {
    /// Depth of the transaction that is closing.
    pub fn nesting_depth(&self) -> usize {
        self.depth
    }

    /// Register a callback on the parent of the closing transaction.
    ///
    /// Panics if the closing transaction is an outer transaction.
    pub fn add_parent_close_callback(
        &self,
        callback: impl FnOnce(&CloseContext<'_>, TransactionResult) + 'static,
    ) {
        assert!(self.depth > 0, "an outer transaction has no parent");
        self.stack.push_callback(self.depth - 1, Box::new(callback));
    }

    pub fn add_outer_close_callback(&self, callback: impl FnOnce(TransactionResult) + 'static) {
        self.stack.push_outer_callback(Box::new(callback));
    }
}
