use crate::access::InputType;
use crate::filter::ResourceFilter;
use crate::modification::ModificationTracker;
use crate::resource::{Resource, Stack};
use crate::snapshot::{SnapshotJournal, SnapshotParticipant, update_snapshots};
use crate::tag::{Tag, normalize, tags_equal};
use crate::transaction::Transaction;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Static configuration of a slot: capacity, filters and access policy.
#[derive(Debug, Clone)]
pub struct SlotConfig<R> {
    capacity: u64,
    filter: ResourceFilter<R>,
    external_filter: ResourceFilter<R>,
    input_type: InputType,
    player_insertion: Option<bool>,
}

impl<R: Resource> SlotConfig<R> {
    /// A storage-type slot that accepts anything up to `capacity`.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            filter: ResourceFilter::any(),
            external_filter: ResourceFilter::any(),
            input_type: InputType::Storage,
            player_insertion: None,
        }
    }

    /// Internal filter, applied on every insertion path.
    pub fn filter(mut self, filter: ResourceFilter<R>) -> Self {
        self.filter = filter;
        self
    }

    /// Additional filter applied only to automation insertion.
    pub fn external_filter(mut self, filter: ResourceFilter<R>) -> Self {
        self.external_filter = filter;
        self
    }

    pub fn input_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    /// Override the player-insertion default implied by the input type.
    pub fn player_insertion(mut self, allowed: bool) -> Self {
        self.player_insertion = Some(allowed);
        self
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SlotState<R> {
    resource: Option<R>,
    amount: u64,
    tag: Option<Tag>,
    modifications: i64,
}

impl<R> SlotState<R> {
    fn empty() -> Self {
        Self {
            resource: None,
            amount: 0,
            tag: None,
            modifications: 0,
        }
    }

    fn is_sane(&self) -> bool {
        match self.resource {
            None => self.amount == 0 && self.tag.is_none(),
            Some(_) => self.amount > 0 && self.tag.as_ref().is_none_or(|t| !t.is_empty()),
        }
    }

    fn clear(&mut self) {
        self.resource = None;
        self.amount = 0;
        self.tag = None;
    }
}

struct SlotCell<R: Resource> {
    config: SlotConfig<R>,
    state: RefCell<SlotState<R>>,
    journal: SnapshotJournal<SlotState<R>>,
    parent: Option<Rc<ModificationTracker>>,
}

impl<R: Resource> SnapshotParticipant for SlotCell<R> {
    type Snapshot = SlotState<R>;

    fn journal(&self) -> &SnapshotJournal<SlotState<R>> {
        &self.journal
    }

    fn create_snapshot(&self) -> SlotState<R> {
        self.state.borrow().clone()
    }

    fn read_snapshot(&self, snapshot: SlotState<R>) {
        debug_assert!(snapshot.is_sane());
        *self.state.borrow_mut() = snapshot;
    }
}

// ---------------------------------------------------------------------------
// ResourceSlot
// ---------------------------------------------------------------------------

/// A container for a single stack of one resource.
///
/// Cloning a `ResourceSlot` yields another handle to the same slot. Every
/// mutation optionally takes a [`Transaction`]; with one, the change is
/// rolled back if that transaction (or any ancestor) aborts. Without one,
/// the change is final and listeners fire immediately.
///
/// The slot is always in one of two states: empty (no resource, amount 0,
/// no tag) or holding a resource with a positive amount and either no tag or
/// a non-empty one.
pub struct ResourceSlot<R: Resource> {
    cell: Rc<SlotCell<R>>,
}

impl<R: Resource> Clone for ResourceSlot<R> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<R: Resource> ResourceSlot<R> {
    /// A standalone slot that reports to no parent tracker.
    pub fn new(config: SlotConfig<R>) -> Self {
        Self::build(config, None)
    }

    pub(crate) fn with_parent(config: SlotConfig<R>, parent: &Rc<ModificationTracker>) -> Self {
        Self::build(config, Some(Rc::clone(parent)))
    }

    fn build(config: SlotConfig<R>, parent: Option<Rc<ModificationTracker>>) -> Self {
        Self {
            cell: Rc::new(SlotCell {
                config,
                state: RefCell::new(SlotState::empty()),
                journal: SnapshotJournal::new(),
                parent,
            }),
        }
    }

    /// Whether two handles refer to the same slot.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.cell, &b.cell)
    }

    fn state(&self) -> Ref<'_, SlotState<R>> {
        self.cell.state.borrow()
    }

    // -- accessors ----------------------------------------------------------

    pub fn resource(&self) -> Option<R> {
        self.state().resource.clone()
    }

    pub fn amount(&self) -> u64 {
        self.state().amount
    }

    pub fn tag(&self) -> Option<Tag> {
        self.state().tag.clone()
    }

    pub fn stack(&self) -> Stack<R> {
        let state = self.state();
        Stack {
            resource: state.resource.clone(),
            amount: state.amount,
            tag: state.tag.clone(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.cell.config.capacity
    }

    pub fn filter(&self) -> &ResourceFilter<R> {
        &self.cell.config.filter
    }

    pub fn external_filter(&self) -> &ResourceFilter<R> {
        &self.cell.config.external_filter
    }

    pub fn input_type(&self) -> InputType {
        self.cell.config.input_type
    }

    /// Whether players may insert into this slot.
    pub fn player_insertion(&self) -> bool {
        self.cell
            .config
            .player_insertion
            .unwrap_or_else(|| self.cell.config.input_type.player_insertion())
    }

    pub fn modifications(&self) -> i64 {
        self.state().modifications
    }

    pub fn is_empty(&self) -> bool {
        self.state().resource.is_none()
    }

    /// Whether the amount has reached [`real_capacity`](Self::real_capacity).
    /// An empty slot with no capacity counts as full.
    pub fn is_full(&self) -> bool {
        self.amount() >= self.real_capacity()
    }

    pub fn is_sane(&self) -> bool {
        self.state().is_sane()
    }

    /// Capacity for `resource`: the slot capacity, bounded by the resource's
    /// stack limit.
    pub fn capacity_for(&self, resource: &R) -> u64 {
        let capacity = self.capacity();
        resource
            .stack_limit()
            .map_or(capacity, |limit| limit.min(capacity))
    }

    /// Capacity for the held resource, or the raw capacity when empty.
    pub fn real_capacity(&self) -> u64 {
        match &self.state().resource {
            Some(r) => self.capacity_for(r),
            None => self.capacity(),
        }
    }

    pub fn contains(&self, resource: &R) -> bool {
        self.state().resource.as_ref() == Some(resource)
    }

    pub fn contains_exact(&self, resource: &R, tag: Option<&Tag>) -> bool {
        let state = self.state();
        state.resource.as_ref() == Some(resource) && tags_equal(state.tag.as_ref(), tag)
    }

    // -- insertion ----------------------------------------------------------

    /// Whether `resource` could stack here with some tag.
    pub fn can_insert(&self, resource: &R) -> bool {
        let state = self.state();
        match &state.resource {
            Some(held) => held == resource,
            None => self.filter().test(resource, None),
        }
    }

    /// Whether `(resource, tag)` could stack here.
    pub fn can_insert_exact(&self, resource: &R, tag: Option<&Tag>) -> bool {
        let state = self.state();
        match &state.resource {
            Some(held) => held == resource && tags_equal(state.tag.as_ref(), tag),
            None => self.filter().test(resource, tag),
        }
    }

    /// Whether all of `amount` would fit.
    pub fn can_insert_amount(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> bool {
        self.try_insert(resource, tag, amount) == amount
    }

    /// How much of `amount` an insert would accept. Never mutates.
    pub fn try_insert(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> u64 {
        if !self.can_insert_exact(resource, tag) {
            return 0;
        }
        let space = self.capacity_for(resource).saturating_sub(self.amount());
        amount.min(space)
    }

    /// Insert up to `amount`, returning how much was accepted.
    pub fn insert(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        let inserted = self.try_insert(resource, tag, amount);
        if inserted == 0 {
            return 0;
        }
        self.mutate(transaction, |state| {
            if state.resource.is_none() {
                state.resource = Some(resource.clone());
                state.tag = normalize(tag.cloned());
            }
            state.amount += inserted;
        });
        inserted
    }

    pub fn insert_one(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        transaction: Option<&Transaction<'_>>,
    ) -> bool {
        self.insert(resource, tag, 1, transaction) == 1
    }

    // -- extraction ---------------------------------------------------------

    /// Whether `amount` of `resource` (or of whatever is held, if `None`) is present.
    pub fn can_extract(&self, resource: Option<&R>, amount: u64) -> bool {
        let state = self.state();
        let matches = resource.is_none_or(|r| state.resource.as_ref() == Some(r));
        matches && state.amount >= amount
    }

    pub fn can_extract_exact(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> bool {
        self.contains_exact(resource, tag) && self.amount() >= amount
    }

    /// How much of `amount` an extract would yield. Never mutates.
    pub fn try_extract(&self, resource: Option<&R>, amount: u64) -> u64 {
        let state = self.state();
        match (&state.resource, resource) {
            (None, _) => 0,
            (Some(held), Some(r)) if held != r => 0,
            _ => amount.min(state.amount),
        }
    }

    pub fn try_extract_exact(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> u64 {
        if self.contains_exact(resource, tag) {
            amount.min(self.amount())
        } else {
            0
        }
    }

    /// Extract up to `amount` regardless of tag. `None` matches whatever is held.
    pub fn extract(
        &self,
        resource: Option<&R>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        let extracted = self.try_extract(resource, amount);
        self.remove(extracted, transaction);
        extracted
    }

    /// Extract up to `amount`, only if the held tag equals `tag`.
    pub fn extract_exact(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        let extracted = self.try_extract_exact(resource, tag, amount);
        self.remove(extracted, transaction);
        extracted
    }

    pub fn extract_one(&self, resource: Option<&R>, transaction: Option<&Transaction<'_>>) -> bool {
        self.extract(resource, 1, transaction) == 1
    }

    pub fn extract_one_exact(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        transaction: Option<&Transaction<'_>>,
    ) -> bool {
        self.extract_exact(resource, tag, 1, transaction) == 1
    }

    fn remove(&self, amount: u64, transaction: Option<&Transaction<'_>>) {
        if amount == 0 {
            return;
        }
        self.mutate(transaction, |state| {
            state.amount -= amount;
            if state.amount == 0 {
                state.clear();
            }
        });
    }

    // -- player access ------------------------------------------------------

    /// Insert on behalf of a player. Rejected unless player insertion is enabled.
    pub fn player_insert(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.player_insertion() {
            return 0;
        }
        self.insert(resource, tag, amount, transaction)
    }

    /// Extract on behalf of a player.
    pub fn player_extract(
        &self,
        resource: Option<&R>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.input_type().player_extraction() {
            return 0;
        }
        self.extract(resource, amount, transaction)
    }

    // -- direct state -------------------------------------------------------

    /// Overwrite the contents without a transaction and without notifying.
    ///
    /// Panics if the arguments describe an inconsistent slot: a resource
    /// with amount 0, or an amount or tag without a resource.
    pub fn set(&self, resource: Option<R>, tag: Option<Tag>, amount: u64) {
        let mut state = self.cell.state.borrow_mut();
        let next = SlotState {
            resource,
            amount,
            tag: normalize(tag),
            modifications: state.modifications,
        };
        assert!(
            next.is_sane(),
            "inconsistent slot contents: a slot is either empty or holds a resource with a positive amount (got amount {amount})"
        );
        *state = next;
    }

    pub fn set_empty(&self) {
        self.cell.state.borrow_mut().clear();
    }

    /// Record a modification that happened outside the normal mutation paths.
    pub fn mark_modified(&self, transaction: Option<&Transaction<'_>>) {
        self.mutate(transaction, |_| {});
    }

    fn mutate(&self, transaction: Option<&Transaction<'_>>, change: impl FnOnce(&mut SlotState<R>)) {
        if let Some(tx) = transaction {
            update_snapshots(&self.cell, tx);
        }
        {
            let mut state = self.cell.state.borrow_mut();
            change(&mut state);
            state.modifications += 1;
            debug_assert!(state.is_sane(), "slot left inconsistent: {state:?}");
        }
        if let Some(parent) = &self.cell.parent {
            parent.mark_modified(transaction);
        }
    }
}

impl<R: Resource> fmt::Debug for ResourceSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ResourceSlot")
            .field("resource", &state.resource)
            .field("amount", &state.amount)
            .field("tag", &state.tag)
            .field("capacity", &self.cell.config.capacity)
            .field("input_type", &self.cell.config.input_type)
            .finish()
    }
}
