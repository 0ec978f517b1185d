//! Access paths from outside the machine.
//!
//! [`ExposedStorage`] is what automation sees through one face of a machine:
//! the face's [`ResourceFlow`] gates the direction, each slot's
//! [`InputType`](crate::access::InputType) gates it again, and insertion also
//! has to pass the slot's external filter. [`PlayerSlot`] is the manual path,
//! gated by the player-insertion flag.

use crate::access::ResourceFlow;
use crate::resource::{Resource, Stack};
use crate::slot::ResourceSlot;
use crate::slotted::SlottedStorage;
use crate::tag::Tag;
use crate::transaction::Transaction;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// ExposedStorage
// ---------------------------------------------------------------------------

/// Automation view of a storage through a face with a fixed flow.
#[derive(Debug)]
pub struct ExposedStorage<'a, R, S: ?Sized> {
    storage: &'a S,
    flow: ResourceFlow,
    _resource: PhantomData<fn() -> R>,
}

impl<'a, R: Resource, S: SlottedStorage<R> + ?Sized> ExposedStorage<'a, R, S> {
    pub fn new(storage: &'a S, flow: ResourceFlow) -> Self {
        Self {
            storage,
            flow,
            _resource: PhantomData,
        }
    }

    pub fn flow(&self) -> ResourceFlow {
        self.flow
    }

    /// Whether any slot accepts automation insertion through this face.
    pub fn supports_insertion(&self) -> bool {
        self.flow.allows_input()
            && self
                .storage
                .iter_slots()
                .any(|s| s.input_type().external_insertion())
    }

    /// Whether any slot allows automation extraction through this face.
    pub fn supports_extraction(&self) -> bool {
        self.flow.allows_output()
            && self
                .storage
                .iter_slots()
                .any(|s| s.input_type().external_extraction())
    }

    pub fn size(&self) -> usize {
        self.storage.size()
    }

    pub fn slot(&self, index: usize) -> ExposedSlot<'a, R> {
        ExposedSlot::new(self.storage.slot(index), self.flow)
    }

    pub fn slots(&self) -> impl Iterator<Item = ExposedSlot<'a, R>> + '_ {
        (0..self.size()).map(move |i| self.slot(i))
    }

    pub fn try_insert(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> u64 {
        let mut inserted = 0;
        for slot in self.slots() {
            if inserted == amount {
                break;
            }
            inserted += slot.try_insert(resource, tag, amount - inserted);
        }
        inserted
    }

    /// Insert through every slot that admits automation input, left to right.
    pub fn insert(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.flow.allows_input() {
            return 0;
        }
        let mut inserted = 0;
        for slot in self.slots() {
            if inserted == amount {
                break;
            }
            inserted += slot.insert(resource, tag, amount - inserted, transaction);
        }
        inserted
    }

    pub fn try_extract(&self, resource: &R, amount: u64) -> u64 {
        let mut extracted = 0;
        for slot in self.slots() {
            if extracted == amount {
                break;
            }
            extracted += slot.try_extract(Some(resource), amount - extracted);
        }
        extracted
    }

    /// Extract `resource` with any tag from slots that allow automation output.
    pub fn extract(&self, resource: &R, amount: u64, transaction: Option<&Transaction<'_>>) -> u64 {
        if !self.flow.allows_output() {
            return 0;
        }
        let mut extracted = 0;
        for slot in self.slots() {
            if extracted == amount {
                break;
            }
            extracted += slot.extract(Some(resource), amount - extracted, transaction);
        }
        extracted
    }

    pub fn extract_exact(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.flow.allows_output() {
            return 0;
        }
        let mut extracted = 0;
        for slot in self.slots() {
            if extracted == amount {
                break;
            }
            extracted += slot.extract_exact(resource, tag, amount - extracted, transaction);
        }
        extracted
    }
}

// ---------------------------------------------------------------------------
// ExposedSlot
// ---------------------------------------------------------------------------

/// Automation view of one slot through a face.
#[derive(Debug, Clone)]
pub struct ExposedSlot<'a, R: Resource> {
    slot: &'a ResourceSlot<R>,
    flow: ResourceFlow,
}

impl<'a, R: Resource> ExposedSlot<'a, R> {
    pub fn new(slot: &'a ResourceSlot<R>, flow: ResourceFlow) -> Self {
        Self { slot, flow }
    }

    pub fn supports_insertion(&self) -> bool {
        self.flow.allows_input() && self.slot.input_type().external_insertion()
    }

    pub fn supports_extraction(&self) -> bool {
        self.flow.allows_output() && self.slot.input_type().external_extraction()
    }

    fn admits(&self, resource: &R, tag: Option<&Tag>) -> bool {
        self.supports_insertion() && self.slot.external_filter().test(resource, tag)
    }

    pub fn try_insert(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> u64 {
        if !self.admits(resource, tag) {
            return 0;
        }
        self.slot.try_insert(resource, tag, amount)
    }

    pub fn insert(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.admits(resource, tag) {
            return 0;
        }
        self.slot.insert(resource, tag, amount, transaction)
    }

    pub fn try_extract(&self, resource: Option<&R>, amount: u64) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.try_extract(resource, amount)
    }

    pub fn extract(
        &self,
        resource: Option<&R>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.extract(resource, amount, transaction)
    }

    pub fn extract_exact(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.extract_exact(resource, tag, amount, transaction)
    }

    pub fn stack(&self) -> Stack<R> {
        self.slot.stack()
    }

    pub fn capacity(&self) -> u64 {
        self.slot.capacity()
    }
}

// ---------------------------------------------------------------------------
// PlayerSlot
// ---------------------------------------------------------------------------

/// Manual (player) access to one slot.
#[derive(Debug, Clone)]
pub struct PlayerSlot<'a, R: Resource> {
    slot: &'a ResourceSlot<R>,
}

impl<'a, R: Resource> PlayerSlot<'a, R> {
    pub fn new(slot: &'a ResourceSlot<R>) -> Self {
        Self { slot }
    }

    pub fn can_insert(&self, resource: &R, tag: Option<&Tag>) -> bool {
        self.slot.player_insertion() && self.slot.can_insert_exact(resource, tag)
    }

    pub fn insert(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        self.slot.player_insert(resource, tag, amount, transaction)
    }

    pub fn extract(
        &self,
        resource: Option<&R>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        self.slot.player_extract(resource, amount, transaction)
    }

    pub fn stack(&self) -> Stack<R> {
        self.slot.stack()
    }

    pub fn slot(&self) -> &'a ResourceSlot<R> {
        self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{InputType, SlotGroupType};
    use crate::filter::ResourceFilter;
    use crate::resource::Item;
    use crate::slot::SlotConfig;
    use crate::storage::ResourceStorage;
    use crate::test_utils::*;

    fn machine() -> ResourceStorage<Item> {
        ResourceStorage::builder()
            .single(
                SlotGroupType::new("input", InputType::Input),
                SlotConfig::new(64).external_filter(ResourceFilter::of_resource(iron())),
            )
            .single(SlotGroupType::new("output", InputType::Output), SlotConfig::new(64))
            .single(SlotGroupType::new("upgrade", InputType::Transfer), SlotConfig::new(1))
            .build()
    }

    #[test]
    fn input_face_inserts_into_input_slots_only() {
        let m = machine();
        let face = m.exposed(ResourceFlow::Input);
        assert!(face.supports_insertion());
        assert!(!face.supports_extraction());
        assert_eq!(face.insert(&iron(), None, 100, None), 64);
        assert_eq!(m.amount(0), 64);
        assert_eq!(m.amount(1), 0);
        assert_eq!(m.amount(2), 0);
    }

    #[test]
    fn external_filter_applies_to_automation_only() {
        let m = machine();
        let face = m.exposed(ResourceFlow::Both);
        assert_eq!(face.insert(&copper(), None, 5, None), 0);
        assert_eq!(m.player_slot(0).insert(&copper(), None, 5, None), 5);
    }

    #[test]
    fn output_face_rejects_insertion() {
        let m = machine();
        let face = m.exposed(ResourceFlow::Output);
        assert!(!face.supports_insertion());
        assert_eq!(face.insert(&iron(), None, 5, None), 0);
        assert!(SlottedStorage::is_empty(&m));
    }

    #[test]
    fn extraction_only_from_output_slots() {
        let m = machine();
        m.insert_at(0, &iron(), None, 5, None);
        m.insert_at(1, &iron(), None, 7, None);
        let face = m.exposed(ResourceFlow::Both);
        assert_eq!(face.try_extract(&iron(), 100), 7);
        assert_eq!(face.extract(&iron(), 100, None), 7);
        assert_eq!(m.amount(0), 5);
        assert_eq!(m.exposed(ResourceFlow::Input).extract(&iron(), 5, None), 0);
    }

    #[test]
    fn transfer_slots_are_player_only() {
        let m = machine();
        let face = m.exposed(ResourceFlow::Both);
        let upgrade = face.slot(2);
        assert!(!upgrade.supports_insertion());
        assert!(!upgrade.supports_extraction());
        assert_eq!(m.player_slot(2).insert(&wrench(), None, 1, None), 1);
        assert_eq!(upgrade.extract(None, 1, None), 0);
        assert_eq!(m.player_slot(2).extract(None, 1, None), 1);
    }

    #[test]
    fn players_cannot_insert_into_output() {
        let m = machine();
        let out = m.player_slot(1);
        assert!(!out.can_insert(&iron(), None));
        assert_eq!(out.insert(&iron(), None, 1, None), 0);
    }

    #[test]
    fn exposed_group_view() {
        let m = machine();
        let input = m.group_by_name("input").map(|g| g.exposed(ResourceFlow::Input));
        let inserted = input.map(|face| face.insert(&iron(), None, 3, None));
        assert_eq!(inserted, Some(3));
    }

    #[test]
    fn exposed_extract_exact() {
        let m = machine();
        m.insert_at(1, &iron(), Some(&enchanted()), 4, None);
        let face = m.exposed(ResourceFlow::Output);
        assert_eq!(face.extract_exact(&iron(), None, 4, None), 0);
        assert_eq!(face.extract_exact(&iron(), Some(&enchanted()), 4, None), 4);
    }
}
