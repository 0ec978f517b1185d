//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::access::{InputType, SlotGroupType};
use crate::id::{FluidTypeId, ItemTypeId};
use crate::modification::ModificationTracker;
use crate::registry::{Registry, RegistryBuilder};
use crate::resource::{Fluid, Item};
use crate::slot::{ResourceSlot, SlotConfig};
use crate::slotted::SlottedStorage;
use crate::storage::ResourceStorage;
use crate::tag::{Tag, TagValue};
use std::cell::Cell;
use std::rc::Rc;

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn iron() -> Item {
    Item::new(ItemTypeId(0), 64)
}
pub fn copper() -> Item {
    Item::new(ItemTypeId(1), 64)
}
pub fn ender_pearl() -> Item {
    Item::new(ItemTypeId(2), 16)
}
pub fn wrench() -> Item {
    Item::new(ItemTypeId(3), 1)
}

/// An item that [`item_registry`] does not know about.
pub fn unregistered_item() -> Item {
    Item::new(ItemTypeId(99), 64)
}

// ===========================================================================
// Fluid constructors
// ===========================================================================

pub fn water() -> Fluid {
    Fluid(FluidTypeId(0))
}
pub fn lava() -> Fluid {
    Fluid(FluidTypeId(1))
}

// ===========================================================================
// Tags
// ===========================================================================

pub fn enchanted() -> Tag {
    let level = Tag::new().with("Level", TagValue::Int(3));
    Tag::new().with("Enchantment", TagValue::Compound(level))
}

pub fn damaged(damage: i64) -> Tag {
    Tag::new().with("Damage", TagValue::Int(damage))
}

// ===========================================================================
// Registries
// ===========================================================================

/// Registry holding every item constructor above except [`unregistered_item`].
pub fn item_registry() -> Registry<Item> {
    let mut b = RegistryBuilder::new();
    for (name, item) in [
        ("iron_ingot", iron()),
        ("copper_ingot", copper()),
        ("ender_pearl", ender_pearl()),
        ("wrench", wrench()),
    ] {
        if let Err(e) = b.register(name, item) {
            panic!("test registry: {e}");
        }
    }
    b.build()
}

pub fn fluid_registry() -> Registry<Fluid> {
    let mut b = RegistryBuilder::new();
    for (name, fluid) in [("water", water()), ("lava", lava())] {
        if let Err(e) = b.register(name, fluid) {
            panic!("test registry: {e}");
        }
    }
    b.build()
}

// ===========================================================================
// Slot and storage builders
// ===========================================================================

pub fn storage_group(name: &str) -> SlotGroupType {
    SlotGroupType::new(name, InputType::Storage)
}

pub fn item_slot(capacity: u64) -> ResourceSlot<Item> {
    ResourceSlot::new(SlotConfig::new(capacity))
}

pub fn fluid_tank(capacity: u64) -> ResourceSlot<Fluid> {
    ResourceSlot::new(SlotConfig::new(capacity))
}

/// One storage-type group of `count` identical item slots.
pub fn item_storage(count: usize, capacity: u64) -> ResourceStorage<Item> {
    ResourceStorage::builder()
        .group(storage_group("main"), |g| g.slots(count, SlotConfig::new(capacity)))
        .build()
}

/// One storage-type group of `count` identical fluid tanks.
pub fn fluid_storage(count: usize, capacity: u64) -> ResourceStorage<Fluid> {
    ResourceStorage::builder()
        .group(storage_group("tanks"), |g| g.slots(count, SlotConfig::new(capacity)))
        .build()
}

/// A furnace-like machine: input, fuel, output and a transfer-only upgrade slot.
pub fn furnace() -> ResourceStorage<Item> {
    ResourceStorage::builder()
        .single(SlotGroupType::new("input", InputType::Input), SlotConfig::new(64))
        .single(SlotGroupType::new("fuel", InputType::Input), SlotConfig::new(64))
        .single(SlotGroupType::new("output", InputType::Output), SlotConfig::new(64))
        .single(SlotGroupType::new("upgrade", InputType::Transfer), SlotConfig::new(1))
        .build()
}

// ===========================================================================
// Observation helpers
// ===========================================================================

/// Install a listener on `tracker` that counts its calls.
pub fn count_notifications(tracker: &ModificationTracker) -> Rc<Cell<u32>> {
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    tracker.set_listener(move || c.set(c.get() + 1));
    calls
}

/// Install a listener on `storage` that counts its calls.
pub fn count_storage_notifications<R: crate::resource::Resource>(
    storage: &ResourceStorage<R>,
) -> Rc<Cell<u32>> {
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    storage.set_listener(move || c.set(c.get() + 1));
    calls
}

/// Panic unless every slot satisfies the slot invariant.
pub fn assert_all_sane<R: crate::resource::Resource, S: SlottedStorage<R> + ?Sized>(storage: &S) {
    for (i, slot) in storage.iter_slots().enumerate() {
        assert!(slot.is_sane(), "slot {i} is inconsistent: {slot:?}");
    }
}

/// Total amount held across all slots.
pub fn total_amount<R: crate::resource::Resource, S: SlottedStorage<R> + ?Sized>(storage: &S) -> u64 {
    storage.iter_slots().map(ResourceSlot::amount).sum()
}
