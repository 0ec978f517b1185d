//! MachineLib Core -- transactional resource storage for machines.
//!
//! This crate provides slots, slot groups and storages that hold items,
//! fluids or any other [`resource::Resource`], with nestable transactions
//! that roll every participating slot back on abort, modification counters
//! for change detection, automation and player access gates, and save/sync
//! encodings.
//!
//! # Transactions
//!
//! Every mutation takes an optional transaction. Nested transactions borrow
//! their parent, so the stack discipline is enforced by the compiler:
//!
//! ```rust,ignore
//! let mut tx = Transaction::open_outer();
//! {
//!     let nested = tx.open_nested();
//!     storage.insert(&iron, None, 10, Some(&nested));
//!     nested.commit();
//! }
//! tx.abort(); // the nested insert is rolled back too
//! ```
//!
//! # Key Types
//!
//! - [`slot::ResourceSlot`] -- One stack of one resource, with capacity,
//!   filters and an access policy.
//! - [`group::SlotGroup`] -- An ordered run of slots sharing an
//!   [`access::InputType`].
//! - [`storage::ResourceStorage`] -- A machine's groups, addressed as one
//!   flat slot list, built with [`storage::ResourceStorageBuilder`].
//! - [`slotted::SlottedStorage`] -- Aggregate operations shared by groups,
//!   storages and [`sub_storage::SubStorage`] views.
//! - [`transaction::Transaction`] -- Nestable rollback scope.
//! - [`snapshot::SnapshotParticipant`] -- How state joins a transaction.
//! - [`exposed::ExposedStorage`] -- Automation access through a machine face.
//! - [`serialize`] -- Save records and versioned binary saves via bitcode.
//! - [`packet`] / [`sync`] -- Wire encoding and delta sync of slot contents.

pub mod access;
pub mod exposed;
pub mod filter;
pub mod group;
pub mod id;
pub mod modification;
pub mod packet;
pub mod registry;
pub mod resource;
pub mod serialize;
pub mod slot;
pub mod slotted;
pub mod snapshot;
pub mod storage;
pub mod sub_storage;
pub mod sync;
pub mod tag;
pub mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
