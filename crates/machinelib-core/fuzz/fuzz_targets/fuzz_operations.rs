#![no_main]
use arbitrary::Arbitrary;
use machinelib_core::resource::Item;
use machinelib_core::slotted::SlottedStorage;
use machinelib_core::storage::ResourceStorage;
use machinelib_core::test_utils::*;
use machinelib_core::transaction::Transaction;
use libfuzzer_sys::fuzz_target;

/// A structured storage operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Insert { item: u8, tagged: bool, amount: u16 },
    Extract { item: u8, amount: u16 },
    SlotInsert { slot: u8, item: u8, amount: u16 },
    SlotExtract { slot: u8, amount: u16 },
}

/// A batch of operations run in a (possibly nested) transaction.
#[derive(Arbitrary, Debug)]
struct Batch {
    ops: Vec<FuzzOp>,
    nested: Vec<FuzzOp>,
    commit_nested: bool,
    commit: bool,
}

/// Top-level fuzz input: a sequence of batches.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    batches: Vec<Batch>,
}

fn item(index: u8) -> Item {
    match index % 4 {
        0 => iron(),
        1 => copper(),
        2 => ender_pearl(),
        _ => wrench(),
    }
}

fn apply(storage: &ResourceStorage<Item>, op: &FuzzOp, tx: &Transaction<'_>) {
    let size = storage.size();
    match *op {
        FuzzOp::Insert { item: i, tagged, amount } => {
            let tag = tagged.then(enchanted);
            storage.insert(&item(i), tag.as_ref(), u64::from(amount), Some(tx));
        }
        FuzzOp::Extract { item: i, amount } => {
            storage.extract(&item(i), u64::from(amount), Some(tx));
        }
        FuzzOp::SlotInsert { slot, item: i, amount } => {
            storage.insert_at(slot as usize % size, &item(i), None, u64::from(amount), Some(tx));
        }
        FuzzOp::SlotExtract { slot, amount } => {
            storage.extract_at(slot as usize % size, None, u64::from(amount), Some(tx));
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let storage = item_storage(6, 64);

    // Limit batches to prevent timeouts.
    for batch in input.batches.iter().take(50) {
        let before: Vec<_> = storage.slots().iter().map(|s| s.stack()).collect();
        let mut tx = Transaction::open_outer();
        for op in batch.ops.iter().take(50) {
            apply(&storage, op, &tx);
        }
        {
            let nested = tx.open_nested();
            for op in batch.nested.iter().take(50) {
                apply(&storage, op, &nested);
            }
            if batch.commit_nested {
                nested.commit();
            } else {
                nested.abort();
            }
        }
        assert_all_sane(&storage);
        if batch.commit {
            tx.commit();
        } else {
            tx.abort();
            let after: Vec<_> = storage.slots().iter().map(|s| s.stack()).collect();
            assert_eq!(before, after);
        }
    }
});
