//! Adversarial input tests for storages.
//!
//! Precondition violations must panic; malformed saves and packets must
//! return errors; extreme amounts must not overflow.

use bytes::BytesMut;
use machinelib_core::packet::{PacketError, write_utf, write_var_int};
use machinelib_core::serialize::{DeserializeError, SlotRecord, StorageRecord};
use machinelib_core::slot::SlotConfig;
use machinelib_core::slot::ResourceSlot;
use machinelib_core::slotted::SlottedStorage;
use machinelib_core::test_utils::*;
use machinelib_core::transaction::Transaction;

#[test]
#[should_panic(expected = "out of range")]
fn storage_index_out_of_range() {
    let storage = item_storage(2, 64);
    storage.insert_at(2, &iron(), None, 1, None);
}

#[test]
#[should_panic(expected = "out of bounds")]
fn sub_storage_past_parent() {
    let storage = item_storage(2, 64);
    let _ = storage.sub_storage(1, usize::MAX);
}

#[test]
#[should_panic(expected = "inconsistent slot contents")]
fn set_with_resource_and_zero_amount() {
    item_slot(64).set(Some(iron()), Some(enchanted()), 0);
}

#[test]
#[should_panic(expected = "outer transaction is already open")]
fn overlapping_outer_transactions() {
    let slot = item_slot(64);
    let first = Transaction::open_outer();
    slot.insert(&iron(), None, 5, Some(&first));
    let second = Transaction::open_outer();
    slot.insert(&iron(), None, 7, Some(&second));
    first.commit();
    second.abort();
}

#[test]
fn outer_transactions_in_sequence_each_roll_back() {
    let slot = item_slot(64);
    let first = Transaction::open_outer();
    slot.insert(&iron(), None, 5, Some(&first));
    first.commit();
    let second = Transaction::open_outer();
    slot.insert(&iron(), None, 7, Some(&second));
    second.abort();
    assert_eq!(slot.amount(), 5);
    assert_eq!(slot.modifications(), 1);
}

#[test]
fn set_with_empty_tag_normalizes() {
    let slot = item_slot(64);
    slot.set(Some(iron()), Some(Default::default()), 3);
    assert_eq!(slot.tag(), None);
    assert!(slot.is_sane());
}

#[test]
fn huge_amounts_saturate_to_capacity() {
    let tank = fluid_tank(u64::MAX);
    assert_eq!(tank.insert(&water(), None, u64::MAX, None), u64::MAX);
    assert_eq!(tank.insert(&water(), None, u64::MAX, None), 0);
    assert_eq!(tank.extract(None, u64::MAX, None), u64::MAX);
    assert!(tank.is_empty());
}

#[test]
fn zero_capacity_slot_accepts_nothing() {
    let slot = ResourceSlot::new(SlotConfig::new(0));
    assert_eq!(slot.insert(&iron(), None, 5, None), 0);
    assert!(!slot.insert_one(&iron(), None, None));
    assert!(slot.is_empty());
    assert!(slot.is_full());
}

#[test]
fn dropped_transaction_rolls_back() {
    let storage = item_storage(2, 64);
    {
        let tx = Transaction::open_outer();
        storage.insert(&iron(), None, 100, Some(&tx));
    }
    assert!(SlottedStorage::is_empty(&storage));
    assert_eq!(storage.modifications(), 0);
}

#[test]
fn save_for_smaller_storage_is_rejected() {
    let storage = item_storage(1, 64);
    let record = StorageRecord {
        slots: vec![
            None,
            Some(SlotRecord {
                resource: "iron_ingot".into(),
                amount: 5,
                tag: None,
            }),
        ],
    };
    let err = storage.read_tag(&record, &item_registry()).unwrap_err();
    assert!(matches!(err, DeserializeError::TooManySlots { .. }));
}

#[test]
fn over_capacity_save_is_loaded_as_is() {
    let storage = item_storage(1, 64);
    let record = StorageRecord {
        slots: vec![Some(SlotRecord {
            resource: "iron_ingot".into(),
            amount: 500,
            tag: None,
        })],
    };
    storage.read_tag(&record, &item_registry()).unwrap();
    assert_eq!(storage.amount(0), 500);
    assert_eq!(storage.insert(&iron(), None, 1, None), 0);
    assert_eq!(storage.extract(&iron(), 500, None), 500);
}

#[test]
fn truncated_storage_packet_is_an_error() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&5u64.to_be_bytes());
    write_utf(&mut buf, "iron_ingot").unwrap();
    // missing compound presence byte
    let storage = item_storage(1, 64);
    let err = storage
        .read_packet(&mut buf.freeze(), &item_registry())
        .unwrap_err();
    assert!(matches!(err, PacketError::UnexpectedEof { .. }));
}

#[test]
fn oversized_length_prefix_is_an_error() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&5u64.to_be_bytes());
    write_var_int(&mut buf, 1_000_000);
    buf.extend_from_slice(b"short");
    let err = item_slot(64)
        .read_packet(&mut buf.freeze(), &item_registry())
        .unwrap_err();
    assert!(matches!(err, PacketError::UnexpectedEof { needed: 1_000_000, .. }));
}

#[test]
fn corrupt_compound_is_an_error() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&5u64.to_be_bytes());
    write_utf(&mut buf, "iron_ingot").unwrap();
    // present but zero-length payload
    buf.extend_from_slice(&[1, 0]);
    let err = item_slot(64)
        .read_packet(&mut buf.freeze(), &item_registry())
        .unwrap_err();
    assert!(matches!(err, PacketError::Compound(_)));
}
