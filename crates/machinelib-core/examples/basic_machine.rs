//! Basic machine example: a smelter with input, fuel and output groups.
//!
//! Builds the storage, feeds it through an automation face, runs a few
//! crafting steps as transactions (aborting when the output is full), and
//! pulls products out through the bottom face.
//!
//! Run with: `RUST_LOG=debug cargo run -p machinelib-core --example basic_machine`

use machinelib_core::access::{InputType, ResourceFlow, SlotGroupType};
use machinelib_core::filter::ResourceFilter;
use machinelib_core::registry::{RegistryBuilder, RegistryError};
use machinelib_core::resource::Item;
use machinelib_core::slot::SlotConfig;
use machinelib_core::slotted::SlottedStorage;
use machinelib_core::storage::ResourceStorage;
use machinelib_core::transaction::Transaction;
use std::cell::Cell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

struct Items {
    ore: Item,
    coal: Item,
    ingot: Item,
}

fn register_items() -> Result<Items, RegistryError> {
    let mut registry = RegistryBuilder::new();
    Ok(Items {
        ore: registry.register_item("iron_ore", 64)?,
        coal: registry.register_item("coal", 64)?,
        ingot: registry.register_item("iron_ingot", 64)?,
    })
}

fn build_smelter(items: &Items) -> ResourceStorage<Item> {
    ResourceStorage::builder()
        .single(
            SlotGroupType::new("input", InputType::Input),
            SlotConfig::new(64).filter(ResourceFilter::of_resource(items.ore)),
        )
        .single(
            SlotGroupType::new("fuel", InputType::Input),
            SlotConfig::new(64).filter(ResourceFilter::of_resource(items.coal)),
        )
        .single(SlotGroupType::new("output", InputType::Output), SlotConfig::new(8))
        .build()
}

/// Consume one ore and one coal, produce one ingot. All or nothing.
fn craft(storage: &ResourceStorage<Item>, items: &Items) -> bool {
    let tx = Transaction::open_outer();
    let ok = storage.slot(0).extract_one(Some(&items.ore), Some(&tx))
        && storage.slot(1).extract_one(Some(&items.coal), Some(&tx))
        && storage.slot(2).insert_one(&items.ingot, None, Some(&tx));
    if ok {
        tx.commit();
    } else {
        tx.abort();
    }
    ok
}

fn main() -> Result<(), RegistryError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let items = register_items()?;
    let smelter = build_smelter(&items);

    let updates = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&updates);
    smelter.set_listener(move || counter.set(counter.get() + 1));

    // --- Step 1: Feed through the top face ---

    let top = smelter.exposed(ResourceFlow::Input);
    println!("Inserted ore:  {}", top.insert(&items.ore, None, 12, None));
    println!("Inserted coal: {}", top.insert(&items.coal, None, 12, None));
    println!("Ingot rejected by filters: {}", top.insert(&items.ingot, None, 1, None) == 0);

    // --- Step 2: Craft until the output fills ---

    let mut crafted = 0;
    while craft(&smelter, &items) {
        crafted += 1;
    }
    println!("\nCrafted {crafted} ingots before the output filled");
    println!("  ore left:  {}", smelter.amount(0));
    println!("  coal left: {}", smelter.amount(1));
    println!("  ingots:    {}", smelter.amount(2));

    // --- Step 3: Pull products from the bottom face ---

    let bottom = smelter.exposed(ResourceFlow::Output);
    println!("\nExtracted ingots: {}", bottom.extract(&items.ingot, 64, None));
    println!("Ore stays put:    {}", bottom.extract(&items.ore, 64, None) == 0);

    println!("\nListener calls:  {}", updates.get());
    println!("Modifications:   {}", smelter.modifications());
    Ok(())
}
