//! Machine energy buffers for MachineLib.
//!
//! A [`MachineEnergyStorage`] is a single counter of stored energy with a
//! capacity and per-operation input/output rate limits. It joins
//! transactions the same way resource slots do, so a machine can move items
//! and spend energy in one all-or-nothing step.
//!
//! # Design
//!
//! - The amount is journaled per transaction depth and restored on abort.
//! - Change counting and listener coalescing reuse the core
//!   [`ModificationTracker`]; the tracker can report to a machine-level
//!   parent.
//! - Automation access goes through [`ExposedEnergyStorage`], gated by the
//!   side's [`ResourceFlow`] and the buffer's automation flags.
//! - Rejections are values (`0` / `false`), never errors.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bytes::{Buf, BufMut};
use machinelib_core::access::ResourceFlow;
use machinelib_core::modification::ModificationTracker;
use machinelib_core::packet::PacketError;
use machinelib_core::snapshot::{SnapshotJournal, SnapshotParticipant, update_snapshots};
use machinelib_core::transaction::Transaction;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Static limits of an energy buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyConfig {
    /// Maximum stored energy.
    pub capacity: u64,
    /// Maximum accepted per insert call.
    pub max_input: u64,
    /// Maximum released per extract call.
    pub max_output: u64,
    /// Whether automation may insert.
    pub insert: bool,
    /// Whether automation may extract.
    pub extract: bool,
}

impl EnergyConfig {
    /// Limits with automation allowed in both directions.
    pub const fn new(capacity: u64, max_input: u64, max_output: u64) -> Self {
        Self {
            capacity,
            max_input,
            max_output,
            insert: true,
            extract: true,
        }
    }

    pub const fn exposed_insertion(mut self, allowed: bool) -> Self {
        self.insert = allowed;
        self
    }

    pub const fn exposed_extraction(mut self, allowed: bool) -> Self {
        self.extract = allowed;
        self
    }
}

// ---------------------------------------------------------------------------
// Machine energy storage
// ---------------------------------------------------------------------------

struct EnergyCell {
    config: EnergyConfig,
    amount: Cell<u64>,
    journal: SnapshotJournal<u64>,
    tracker: Rc<ModificationTracker>,
}

impl SnapshotParticipant for EnergyCell {
    type Snapshot = u64;

    fn journal(&self) -> &SnapshotJournal<u64> {
        &self.journal
    }

    fn create_snapshot(&self) -> u64 {
        self.amount.get()
    }

    fn read_snapshot(&self, snapshot: u64) {
        self.amount.set(snapshot);
    }
}

/// A machine's energy buffer.
///
/// Cloning yields another handle to the same buffer.
#[derive(Clone)]
pub struct MachineEnergyStorage {
    cell: Rc<EnergyCell>,
}

impl MachineEnergyStorage {
    /// An empty buffer with its own modification tracker.
    pub fn new(config: EnergyConfig) -> Self {
        Self::build(config, ModificationTracker::new())
    }

    /// An empty buffer whose changes also count toward `parent`.
    pub fn with_parent(config: EnergyConfig, parent: &Rc<ModificationTracker>) -> Self {
        Self::build(config, ModificationTracker::with_parent(parent))
    }

    fn build(config: EnergyConfig, tracker: Rc<ModificationTracker>) -> Self {
        Self {
            cell: Rc::new(EnergyCell {
                config,
                amount: Cell::new(0),
                journal: SnapshotJournal::new(),
                tracker,
            }),
        }
    }

    pub fn config(&self) -> EnergyConfig {
        self.cell.config
    }

    pub fn amount(&self) -> u64 {
        self.cell.amount.get()
    }

    pub fn capacity(&self) -> u64 {
        self.cell.config.capacity
    }

    pub fn max_input(&self) -> u64 {
        self.cell.config.max_input
    }

    pub fn max_output(&self) -> u64 {
        self.cell.config.max_output
    }

    pub fn is_empty(&self) -> bool {
        self.amount() == 0
    }

    pub fn is_full(&self) -> bool {
        self.amount() >= self.capacity()
    }

    pub fn supports_insertion(&self) -> bool {
        self.max_input() > 0
    }

    pub fn supports_extraction(&self) -> bool {
        self.max_output() > 0
    }

    pub fn modifications(&self) -> i64 {
        self.cell.tracker.modifications()
    }

    /// Install the change listener. Fires once per direct change, or once per
    /// committed outer transaction.
    pub fn set_listener(&self, listener: impl Fn() + 'static) {
        self.cell.tracker.set_listener(listener);
    }

    // -- queries -------------------------------------------------------------

    /// Whether exactly `amount` fits within both the input rate and the
    /// remaining capacity.
    pub fn can_insert(&self, amount: u64) -> bool {
        amount <= self.max_input()
            && self
                .amount()
                .checked_add(amount)
                .is_some_and(|total| total <= self.capacity())
    }

    /// Whether exactly `amount` is stored and within the output rate.
    pub fn can_extract(&self, amount: u64) -> bool {
        amount <= self.max_output() && amount <= self.amount()
    }

    /// How much of `amount` an insert would accept.
    pub fn try_insert(&self, amount: u64) -> u64 {
        let room = self.capacity().saturating_sub(self.amount());
        self.max_input().min(room).min(amount)
    }

    /// How much of `amount` an extract would release.
    pub fn try_extract(&self, amount: u64) -> u64 {
        self.max_output().min(self.amount()).min(amount)
    }

    // -- mutation ------------------------------------------------------------

    /// Insert up to `amount`, bounded by rate and capacity. Returns the
    /// amount accepted.
    pub fn insert(&self, amount: u64, transaction: Option<&Transaction<'_>>) -> u64 {
        let inserted = self.try_insert(amount);
        if inserted > 0 {
            self.mutate(transaction, self.amount() + inserted);
        }
        inserted
    }

    /// Extract up to `amount`, bounded by rate and stored energy. Returns the
    /// amount released.
    pub fn extract(&self, amount: u64, transaction: Option<&Transaction<'_>>) -> u64 {
        let extracted = self.try_extract(amount);
        if extracted > 0 {
            self.mutate(transaction, self.amount() - extracted);
        }
        extracted
    }

    /// Insert exactly `amount` or nothing.
    pub fn insert_exact(&self, amount: u64, transaction: Option<&Transaction<'_>>) -> bool {
        if amount == 0 || !self.can_insert(amount) {
            return false;
        }
        self.mutate(transaction, self.amount() + amount);
        true
    }

    /// Extract exactly `amount` or nothing.
    pub fn extract_exact(&self, amount: u64, transaction: Option<&Transaction<'_>>) -> bool {
        if amount == 0 || !self.can_extract(amount) {
            return false;
        }
        self.mutate(transaction, self.amount() - amount);
        true
    }

    /// Overwrite the stored energy, ignoring rates and capacity. Counts as a
    /// modification.
    pub fn set_energy(&self, amount: u64, transaction: Option<&Transaction<'_>>) {
        self.mutate(transaction, amount);
    }

    fn mutate(&self, transaction: Option<&Transaction<'_>>, amount: u64) {
        if let Some(tx) = transaction {
            update_snapshots(&self.cell, tx);
        }
        self.cell.amount.set(amount);
        self.cell.tracker.mark_modified(transaction);
    }

    // -- views ---------------------------------------------------------------

    /// Automation access from a side with the given flow, or `None` when
    /// neither direction is permitted there.
    pub fn exposed(&self, flow: ResourceFlow) -> Option<ExposedEnergyStorage<'_>> {
        let insert = flow.allows_input() && self.cell.config.insert;
        let extract = flow.allows_output() && self.cell.config.extract;
        (insert || extract).then_some(ExposedEnergyStorage {
            storage: self,
            insert,
            extract,
        })
    }

    // -- persistence ---------------------------------------------------------

    pub fn to_tag(&self) -> EnergyRecord {
        EnergyRecord {
            amount: self.amount(),
        }
    }

    /// Restore the stored energy from a save. Not counted as a modification.
    pub fn read_tag(&self, record: &EnergyRecord) {
        self.cell.amount.set(record.amount);
    }

    /// Big-endian `u64` amount.
    pub fn write_packet(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.amount());
    }

    pub fn read_packet(&self, buf: &mut impl Buf) -> Result<(), PacketError> {
        if buf.remaining() < 8 {
            return Err(PacketError::UnexpectedEof {
                needed: 8,
                remaining: buf.remaining(),
            });
        }
        self.cell.amount.set(buf.get_u64());
        Ok(())
    }

    pub fn create_sync_handler(&self) -> EnergySyncHandler {
        EnergySyncHandler::new(self)
    }
}

impl fmt::Debug for MachineEnergyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineEnergyStorage")
            .field("amount", &self.amount())
            .field("config", &self.cell.config)
            .field("modifications", &self.modifications())
            .finish()
    }
}

/// Saved form of an energy buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Exposed view
// ---------------------------------------------------------------------------

/// Energy buffer as seen by automation on one side of a machine.
#[derive(Debug, Clone, Copy)]
pub struct ExposedEnergyStorage<'a> {
    storage: &'a MachineEnergyStorage,
    insert: bool,
    extract: bool,
}

impl ExposedEnergyStorage<'_> {
    pub fn supports_insertion(&self) -> bool {
        self.insert && self.storage.supports_insertion()
    }

    pub fn supports_extraction(&self) -> bool {
        self.extract && self.storage.supports_extraction()
    }

    pub fn insert(&self, amount: u64, transaction: Option<&Transaction<'_>>) -> u64 {
        if !self.insert {
            return 0;
        }
        self.storage.insert(amount, transaction)
    }

    pub fn extract(&self, amount: u64, transaction: Option<&Transaction<'_>>) -> u64 {
        if !self.extract {
            return 0;
        }
        self.storage.extract(amount, transaction)
    }

    pub fn amount(&self) -> u64 {
        self.storage.amount()
    }

    pub fn capacity(&self) -> u64 {
        self.storage.capacity()
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Sends the stored amount whenever it differs from the last synced value.
#[derive(Debug)]
pub struct EnergySyncHandler {
    storage: MachineEnergyStorage,
    synced: u64,
}

impl EnergySyncHandler {
    /// The observer is assumed to start empty, so a buffer restored from a
    /// save is sent on the first sync.
    pub fn new(storage: &MachineEnergyStorage) -> Self {
        Self {
            storage: storage.clone(),
            synced: 0,
        }
    }

    pub fn needs_syncing(&self) -> bool {
        self.storage.amount() != self.synced
    }

    pub fn sync(&mut self, buf: &mut impl BufMut) {
        self.synced = self.storage.amount();
        self.storage.write_packet(buf);
        tracing::trace!(amount = self.synced, "energy sync written");
    }

    /// Apply a synced amount. Observers on this side are notified.
    pub fn read(&self, buf: &mut impl Buf) -> Result<(), PacketError> {
        self.storage.read_packet(buf)?;
        self.storage.cell.tracker.mark_modified(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use machinelib_core::test_utils::count_notifications;

    fn battery() -> MachineEnergyStorage {
        MachineEnergyStorage::new(EnergyConfig::new(1000, 100, 50))
    }

    // -----------------------------------------------------------------------
    // Rates and capacity
    // -----------------------------------------------------------------------

    #[test]
    fn insert_is_bounded_by_rate_and_capacity() {
        let b = battery();
        assert_eq!(b.insert(500, None), 100);
        b.set_energy(950, None);
        assert_eq!(b.try_insert(500), 50);
        assert_eq!(b.insert(500, None), 50);
        assert!(b.is_full());
        assert_eq!(b.insert(1, None), 0);
    }

    #[test]
    fn extract_is_bounded_by_rate_and_amount() {
        let b = battery();
        b.set_energy(30, None);
        assert_eq!(b.try_extract(100), 30);
        b.set_energy(500, None);
        assert_eq!(b.extract(500, None), 50);
        assert_eq!(b.amount(), 450);
    }

    #[test]
    fn exact_operations_are_all_or_nothing() {
        let b = battery();
        assert!(!b.insert_exact(101, None));
        assert!(b.insert_exact(100, None));
        assert!(!b.extract_exact(51, None));
        assert!(!b.extract_exact(0, None));
        assert!(b.extract_exact(50, None));
        assert_eq!(b.amount(), 50);
    }

    #[test]
    fn can_insert_respects_remaining_capacity() {
        let b = battery();
        b.set_energy(990, None);
        assert!(b.can_insert(10));
        assert!(!b.can_insert(11));
        b.set_energy(u64::MAX - 1, None);
        assert!(!b.can_insert(100));
        assert_eq!(b.try_insert(100), 0);
    }

    #[test]
    fn zero_rates_disable_directions() {
        let sink = MachineEnergyStorage::new(EnergyConfig::new(1000, 100, 0));
        assert!(sink.supports_insertion());
        assert!(!sink.supports_extraction());
        sink.insert(100, None);
        assert_eq!(sink.extract(10, None), 0);
    }

    // -----------------------------------------------------------------------
    // Transactions and listeners
    // -----------------------------------------------------------------------

    #[test]
    fn abort_restores_amount_and_count() {
        let b = battery();
        b.insert(40, None);
        let tx = Transaction::open_outer();
        b.insert(60, Some(&tx));
        b.extract(20, Some(&tx));
        assert_eq!(b.amount(), 80);
        tx.abort();
        assert_eq!(b.amount(), 40);
        assert_eq!(b.modifications(), 1);
    }

    #[test]
    fn listener_fires_once_per_outer_commit() {
        let parent = ModificationTracker::new();
        let b = MachineEnergyStorage::with_parent(EnergyConfig::new(1000, 100, 50), &parent);
        let calls = count_notifications(&parent);

        let mut tx = Transaction::open_outer();
        b.insert(10, Some(&tx));
        {
            let nested = tx.open_nested();
            b.insert(10, Some(&nested));
            nested.commit();
        }
        b.extract(5, Some(&tx));
        assert_eq!(calls.get(), 0);
        tx.commit();

        assert_eq!(calls.get(), 1);
        assert_eq!(b.amount(), 15);
        assert_eq!(parent.modifications(), 3);
    }

    #[test]
    fn rejected_operations_do_not_count() {
        let b = battery();
        b.extract(10, None);
        b.insert(0, None);
        assert_eq!(b.modifications(), 0);
    }

    // -----------------------------------------------------------------------
    // Exposure
    // -----------------------------------------------------------------------

    #[test]
    fn exposure_follows_flow_and_flags() {
        let generator = MachineEnergyStorage::new(
            EnergyConfig::new(1000, 100, 50).exposed_insertion(false),
        );
        generator.set_energy(500, None);

        assert!(generator.exposed(ResourceFlow::Input).is_none());
        let out = generator.exposed(ResourceFlow::Output).map(|e| e.extract(100, None));
        assert_eq!(out, Some(50));

        let both = generator.exposed(ResourceFlow::Both);
        assert!(both.is_some_and(|e| !e.supports_insertion() && e.supports_extraction()));
        assert_eq!(both.map(|e| e.insert(10, None)), Some(0));
    }

    #[test]
    fn exposed_input_cannot_extract() {
        let b = battery();
        b.set_energy(100, None);
        let input = b.exposed(ResourceFlow::Input);
        assert_eq!(input.map(|e| e.extract(10, None)), Some(0));
        assert_eq!(input.map(|e| e.insert(10, None)), Some(10));
        assert_eq!(b.amount(), 110);
    }

    // -----------------------------------------------------------------------
    // Persistence and sync
    // -----------------------------------------------------------------------

    #[test]
    fn tag_round_trip_does_not_count() {
        let b = battery();
        b.set_energy(321, None);
        let restored = battery();
        restored.read_tag(&b.to_tag());
        assert_eq!(restored.amount(), 321);
        assert_eq!(restored.modifications(), 0);
    }

    #[test]
    fn truncated_packet_is_an_error() {
        let b = battery();
        let err = b.read_packet(&mut &[0u8, 1, 2][..]).unwrap_err();
        assert!(matches!(err, PacketError::UnexpectedEof { needed: 8, remaining: 3 }));
    }

    #[test]
    fn sync_sends_only_changes() {
        let server = battery();
        let client = battery();
        let mut handler = server.create_sync_handler();
        let mirror = client.create_sync_handler();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        client.set_listener(move || counter.set(counter.get() + 1));

        assert!(!handler.needs_syncing());
        server.insert(75, None);
        assert!(handler.needs_syncing());

        let mut buf = BytesMut::new();
        handler.sync(&mut buf);
        assert!(!handler.needs_syncing());
        mirror.read(&mut buf.freeze()).unwrap();

        assert_eq!(client.amount(), 75);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn restored_amount_reaches_a_new_observer() {
        let saved = battery();
        saved.set_energy(640, None);
        let record = saved.to_tag();

        let server = battery();
        server.read_tag(&record);
        assert_eq!(server.modifications(), 0);

        let client = battery();
        let mut handler = server.create_sync_handler();
        assert!(handler.needs_syncing());
        let mut buf = BytesMut::new();
        handler.sync(&mut buf);
        client.create_sync_handler().read(&mut buf.freeze()).unwrap();
        assert_eq!(client.amount(), 640);
    }
}
