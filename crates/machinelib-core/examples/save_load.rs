//! Save/load example: record, binary and packet round trips.
//!
//! Fills a chest and a tank, saves them to bitcode bytes, loads them into
//! fresh storages, then mirrors the chest to a client copy with delta sync.
//!
//! Run with: `cargo run -p machinelib-core --example save_load`

use bytes::BytesMut;
use machinelib_core::access::{InputType, SlotGroupType};
use machinelib_core::registry::RegistryBuilder;
use machinelib_core::resource::{Fluid, Item};
use machinelib_core::slot::SlotConfig;
use machinelib_core::slotted::SlottedStorage;
use machinelib_core::storage::ResourceStorage;
use machinelib_core::tag::{Tag, TagValue};
use std::error::Error;

fn chest() -> ResourceStorage<Item> {
    ResourceStorage::builder()
        .group(SlotGroupType::new("main", InputType::Storage), |g| {
            g.slots(9, SlotConfig::new(64))
        })
        .build()
}

fn tank() -> ResourceStorage<Fluid> {
    ResourceStorage::builder()
        .single(
            SlotGroupType::new("tank", InputType::Storage),
            SlotConfig::new(16 * Fluid::BUCKET),
        )
        .build()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().init();

    let mut items = RegistryBuilder::new();
    let iron = items.register_item("iron_ingot", 64)?;
    let pick = items.register_item("pickaxe", 1)?;
    let items = items.build();

    let mut fluids = RegistryBuilder::new();
    let water = fluids.register_fluid("water")?;
    let fluids = fluids.build();

    // --- Step 1: Fill ---

    let server = chest();
    server.insert(&iron, None, 100, None);
    let worn = Tag::new().with("Damage", TagValue::Int(17));
    server.insert(&pick, Some(&worn), 1, None);

    let water_tank = tank();
    water_tank.insert(&water, None, 3 * Fluid::BUCKET + Fluid::BOTTLE, None);

    // --- Step 2: Binary save ---

    let chest_bytes = server.to_bytes(&items)?;
    let tank_bytes = water_tank.to_bytes(&fluids)?;
    println!("Chest save: {} bytes", chest_bytes.len());
    println!("Tank save:  {} bytes", tank_bytes.len());

    let restored = chest();
    restored.read_bytes(&chest_bytes, &items)?;
    let restored_tank = tank();
    restored_tank.read_bytes(&tank_bytes, &fluids)?;

    for i in 0..server.size() {
        assert_eq!(server.slot(i).stack(), restored.slot(i).stack());
    }
    assert_eq!(restored_tank.amount(0), water_tank.amount(0));
    println!("Restored {} iron, {} droplets of water", restored.count(&iron), restored_tank.amount(0));

    // --- Step 3: Delta sync to a client mirror ---

    let client = chest();
    let mut sync = server.create_sync_handler();
    let mut buf = BytesMut::new();
    let sent = sync.sync(&mut buf, &items)?;
    let len = buf.len();
    client.create_sync_handler().read(&mut buf.split().freeze(), &items)?;
    println!("\nInitial sync sent {sent} slots ({len} bytes)");

    server.extract(&iron, 10, None);
    let sent = sync.sync(&mut buf, &items)?;
    let len = buf.len();
    client.create_sync_handler().read(&mut buf.split().freeze(), &items)?;
    println!("Delta sync sent {sent} slot ({len} bytes)");

    assert_eq!(client.count(&iron), server.count(&iron));
    assert_eq!(client.count_exact(&pick, Some(&worn)), 1);
    println!("\nClient mirror matches server.");
    Ok(())
}
