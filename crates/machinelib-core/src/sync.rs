use crate::packet::{PacketError, read_var_int, write_var_int};
use crate::resource::{Resource, ResourceResolver};
use crate::slot::ResourceSlot;
use crate::slotted::SlottedStorage;
use crate::storage::ResourceStorage;
use bytes::{Buf, BufMut};

/// Sends only the slots that changed since the last sync.
///
/// The sending side remembers each slot's modification count as of the last
/// [`sync`](StorageSyncHandler::sync). A sync writes a varint count followed
/// by `(varint index, slot packet)` for each changed slot. The receiving side
/// applies the same stream with [`read`](StorageSyncHandler::read).
#[derive(Debug)]
pub struct StorageSyncHandler<R: Resource> {
    slots: Vec<ResourceSlot<R>>,
    /// Count as of the last sync. `None` until a slot holding contents is sent.
    synced: Vec<Option<i64>>,
}

impl<R: Resource> StorageSyncHandler<R> {
    /// Track every slot of `storage`. The first sync sends every slot that
    /// holds contents or has ever been modified, so contents restored from a
    /// save reach the observer even though loading does not count as a
    /// modification.
    pub fn new<S: SlottedStorage<R> + ?Sized>(storage: &S) -> Self {
        let slots: Vec<_> = storage.iter_slots().cloned().collect();
        let synced = slots
            .iter()
            .map(|slot| slot.is_empty().then_some(0))
            .collect();
        Self { slots, synced }
    }

    pub fn needs_syncing(&self) -> bool {
        self.changed().next().is_some()
    }

    fn changed(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .zip(&self.synced)
            .enumerate()
            .filter(|(_, (slot, synced))| Some(slot.modifications()) != **synced)
            .map(|(index, _)| index)
    }

    /// Write all changed slots and remember their counts. Returns how many
    /// slots were written.
    pub fn sync(
        &mut self,
        buf: &mut impl BufMut,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<usize, PacketError> {
        let changed: Vec<usize> = self.changed().collect();
        write_var_int(buf, changed.len() as u32);
        for &index in &changed {
            write_var_int(buf, index as u32);
            self.slots[index].write_packet(buf, resolver)?;
            self.synced[index] = Some(self.slots[index].modifications());
        }
        tracing::trace!(slots = changed.len(), "storage sync written");
        Ok(changed.len())
    }

    /// Apply a sync stream to the tracked slots. Each updated slot is marked
    /// modified so observers on this side are notified.
    pub fn read(
        &self,
        buf: &mut impl Buf,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<usize, PacketError> {
        let count = read_var_int(buf)? as usize;
        for _ in 0..count {
            let index = read_var_int(buf)? as usize;
            let slot = self.slots.get(index).ok_or(PacketError::SlotOutOfRange {
                index,
                size: self.slots.len(),
            })?;
            slot.read_packet(buf, resolver)?;
            slot.mark_modified(None);
        }
        Ok(count)
    }
}

impl<R: Resource> ResourceStorage<R> {
    pub fn create_sync_handler(&self) -> StorageSyncHandler<R> {
        StorageSyncHandler::new(self)
    }
}
