use crate::access::SlotGroupType;
use crate::exposed::PlayerSlot;
use crate::group::{SlotGroup, SlotGroupBuilder};
use crate::modification::ModificationTracker;
use crate::resource::Resource;
use crate::slot::{ResourceSlot, SlotConfig};
use crate::slotted::SlottedStorage;
use std::rc::Rc;

/// Declares the groups of a [`ResourceStorage`] in order.
#[derive(Debug)]
pub struct ResourceStorageBuilder<R> {
    groups: Vec<(SlotGroupType, Vec<SlotConfig<R>>)>,
}

impl<R: Resource> Default for ResourceStorageBuilder<R> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}

impl<R: Resource> ResourceStorageBuilder<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group whose slots are declared by `build`.
    pub fn group(
        mut self,
        group_type: SlotGroupType,
        build: impl FnOnce(SlotGroupBuilder<R>) -> SlotGroupBuilder<R>,
    ) -> Self {
        let configs = build(SlotGroupBuilder::new(group_type.input_type())).into_configs();
        self.groups.push((group_type, configs));
        self
    }

    /// Append a group with a single slot.
    pub fn single(self, group_type: SlotGroupType, config: SlotConfig<R>) -> Self {
        self.group(group_type, |g| g.slot(config))
    }

    pub fn build(self) -> ResourceStorage<R> {
        let tracker = ModificationTracker::new();
        let groups: Box<[SlotGroup<R>]> = self
            .groups
            .into_iter()
            .map(|(group_type, configs)| SlotGroup::with_parent(group_type, configs, &tracker))
            .collect();
        let slots = groups
            .iter()
            .flat_map(|group| group.slots().iter().cloned())
            .collect();
        ResourceStorage {
            groups,
            slots,
            tracker,
        }
    }
}

/// A machine's complete set of slot groups, addressed as one flat slot list.
///
/// Flat slot order is group order, then slot order within each group. Every
/// slot change bumps the slot's, its group's and the storage's counters.
#[derive(Debug)]
pub struct ResourceStorage<R: Resource> {
    groups: Box<[SlotGroup<R>]>,
    slots: Box<[ResourceSlot<R>]>,
    tracker: Rc<ModificationTracker>,
}

impl<R: Resource> ResourceStorage<R> {
    pub fn builder() -> ResourceStorageBuilder<R> {
        ResourceStorageBuilder::new()
    }

    pub fn groups(&self) -> &[SlotGroup<R>] {
        &self.groups
    }

    /// The group at `index`. Panics if out of range.
    pub fn group(&self, index: usize) -> &SlotGroup<R> {
        assert!(
            index < self.groups.len(),
            "group index {index} out of range for storage of {} groups",
            self.groups.len()
        );
        &self.groups[index]
    }

    /// The first group with the given name.
    pub fn group_by_name(&self, name: &str) -> Option<&SlotGroup<R>> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn slots(&self) -> &[ResourceSlot<R>] {
        &self.slots
    }

    /// Player-facing access to the slot at `index`.
    pub fn player_slot(&self, index: usize) -> PlayerSlot<'_, R> {
        PlayerSlot::new(self.slot(index))
    }

    /// Called after every change to this storage that is not rolled back.
    /// Transactional changes notify once per outer commit.
    pub fn set_listener(&self, listener: impl Fn() + 'static) {
        self.tracker.set_listener(listener);
    }

    pub fn clear_listener(&self) {
        self.tracker.clear_listener();
    }
}

impl<R: Resource> SlottedStorage<R> for ResourceStorage<R> {
    fn size(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: usize) -> &ResourceSlot<R> {
        assert!(
            index < self.slots.len(),
            "slot index {index} out of range for storage of {} slots",
            self.slots.len()
        );
        &self.slots[index]
    }

    fn modifications(&self) -> i64 {
        self.tracker.modifications()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::InputType;
    use crate::resource::{Fluid, Item};
    use crate::test_utils::*;
    use crate::transaction::Transaction;
    use std::cell::Cell;

    fn furnace() -> ResourceStorage<Item> {
        ResourceStorage::builder()
            .single(SlotGroupType::new("input", InputType::Input), SlotConfig::new(64))
            .single(SlotGroupType::new("fuel", InputType::Input), SlotConfig::new(64))
            .single(SlotGroupType::new("output", InputType::Output), SlotConfig::new(64))
            .build()
    }

    #[test]
    fn flat_order_follows_groups() {
        let storage = furnace();
        assert_eq!(storage.size(), 3);
        assert_eq!(storage.groups().len(), 3);
        assert!(ResourceSlot::ptr_eq(storage.slot(2), storage.group(2).slot(0)));
        assert_eq!(storage.slot(2).input_type(), InputType::Output);
    }

    #[test]
    fn group_by_name_finds_group() {
        let storage = furnace();
        let fuel = storage.group_by_name("fuel").map(SlotGroup::name);
        assert_eq!(fuel, Some("fuel"));
        assert!(storage.group_by_name("missing").is_none());
    }

    #[test]
    fn counters_propagate_through_chain() {
        let storage = furnace();
        storage.slot(1).insert(&iron(), None, 4, None);
        storage.slot(1).extract(None, 1, None);
        assert_eq!(storage.slot(1).modifications(), 2);
        assert_eq!(storage.group(1).modifications(), 2);
        assert_eq!(storage.group(0).modifications(), 0);
        assert_eq!(storage.modifications(), 2);
    }

    #[test]
    fn listener_fires_immediately_without_transaction() {
        let storage = furnace();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        storage.set_listener(move || c.set(c.get() + 1));
        storage.slot(0).insert(&iron(), None, 1, None);
        storage.slot(0).insert(&iron(), None, 1, None);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn listener_coalesced_and_skipped_on_abort() {
        let storage = furnace();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        storage.set_listener(move || c.set(c.get() + 1));

        let tx = Transaction::open_outer();
        storage.slot(0).insert(&iron(), None, 1, Some(&tx));
        storage.slot(1).insert(&iron(), None, 1, Some(&tx));
        tx.abort();
        assert_eq!(calls.get(), 0);
        assert_eq!(storage.modifications(), 0);

        let tx = Transaction::open_outer();
        storage.slot(0).insert(&iron(), None, 1, Some(&tx));
        storage.slot(1).insert(&iron(), None, 1, Some(&tx));
        tx.commit();
        assert_eq!(calls.get(), 1);
        assert_eq!(storage.modifications(), 2);
    }

    #[test]
    fn fluid_storage_builds() {
        let tanks: ResourceStorage<Fluid> = ResourceStorage::builder()
            .group(storage_group("tanks"), |g| {
                g.slots(2, SlotConfig::new(8 * Fluid::BUCKET))
            })
            .build();
        assert_eq!(tanks.insert(&water(), None, 10 * Fluid::BUCKET, None), 10 * Fluid::BUCKET);
        assert_eq!(tanks.amount(1), 2 * Fluid::BUCKET);
    }

    #[test]
    #[should_panic(expected = "group index 5 out of range")]
    fn group_out_of_range_panics() {
        let _ = furnace().group(5);
    }
}
