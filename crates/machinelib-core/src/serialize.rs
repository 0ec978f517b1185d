//! Persistent save records for slots and storages.
//!
//! A storage saves as a positional list of slot records keyed by resource
//! name (resolved through a [`ResourceResolver`]). The same record is used
//! for text formats via serde and for binary saves via `bitcode`, where it is
//! prefixed with a versioned header.

use crate::resource::{Resource, ResourceResolver};
use crate::slot::ResourceSlot;
use crate::slotted::SlottedStorage;
use crate::storage::ResourceStorage;
use crate::tag::Tag;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a binary storage save.
pub const SNAPSHOT_MAGIC: u32 = 0x4D4C_5301;

/// Current format version. Increment when breaking the binary format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while saving.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("resource {0} has no registered key")]
    UnregisteredResource(String),
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur while loading.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("save has {records} slot records but the storage has {slots} slots")]
    TooManySlots { records: usize, slots: usize },
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Saved contents of one non-empty slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub resource: String,
    pub amount: u64,
    pub tag: Option<Tag>,
}

/// Saved contents of a storage. `None` marks an empty slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub slots: Vec<Option<SlotRecord>>,
}

impl<R: Resource> ResourceSlot<R> {
    /// Save this slot. Empty slots save as `None`.
    pub fn to_record(
        &self,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<Option<SlotRecord>, SerializeError> {
        let stack = self.stack();
        let Some(resource) = stack.resource else {
            return Ok(None);
        };
        let key = resolver
            .resource_key(&resource)
            .ok_or_else(|| SerializeError::UnregisteredResource(format!("{resource:?}")))?;
        Ok(Some(SlotRecord {
            resource: key,
            amount: stack.amount,
            tag: stack.tag,
        }))
    }

    /// Restore this slot from a record. An unknown resource key or a zero
    /// amount leaves the slot empty.
    pub fn read_record(&self, record: Option<&SlotRecord>, resolver: &impl ResourceResolver<R>) {
        let Some(record) = record.filter(|r| r.amount > 0) else {
            self.set_empty();
            return;
        };
        match resolver.resolve(&record.resource) {
            Some(resource) => self.set(Some(resource), record.tag.clone(), record.amount),
            None => {
                tracing::warn!(key = %record.resource, kind = R::KIND, "unknown resource in saved slot, leaving it empty");
                self.set_empty();
            }
        }
    }
}

/// Save every slot of `storage` in order.
pub fn storage_record<R: Resource, S: SlottedStorage<R> + ?Sized>(
    storage: &S,
    resolver: &impl ResourceResolver<R>,
) -> Result<StorageRecord, SerializeError> {
    let slots = storage
        .iter_slots()
        .map(|slot| slot.to_record(resolver))
        .collect::<Result<_, _>>()?;
    Ok(StorageRecord { slots })
}

/// Restore `storage` from a record. Slots past the end of the record are
/// left untouched.
pub fn apply_storage_record<R: Resource, S: SlottedStorage<R> + ?Sized>(
    storage: &S,
    record: &StorageRecord,
    resolver: &impl ResourceResolver<R>,
) -> Result<(), DeserializeError> {
    if record.slots.len() > storage.size() {
        return Err(DeserializeError::TooManySlots {
            records: record.slots.len(),
            slots: storage.size(),
        });
    }
    for (index, slot_record) in record.slots.iter().enumerate() {
        storage.slot(index).read_record(slot_record.as_ref(), resolver);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every binary save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
}

impl SnapshotHeader {
    pub fn new() -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StorageSnapshot {
    header: SnapshotHeader,
    record: StorageRecord,
}

/// Read the header of a binary save without applying it.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: StorageSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// ResourceStorage entry points
// ---------------------------------------------------------------------------

impl<R: Resource> ResourceStorage<R> {
    pub fn create_tag(
        &self,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<StorageRecord, SerializeError> {
        storage_record(self, resolver)
    }

    pub fn read_tag(
        &self,
        record: &StorageRecord,
        resolver: &impl ResourceResolver<R>,
    ) -> Result<(), DeserializeError> {
        apply_storage_record(self, record, resolver)
    }

    /// Encode the storage as a binary save.
    pub fn to_bytes(&self, resolver: &impl ResourceResolver<R>) -> Result<Vec<u8>, SerializeError> {
        let snapshot = StorageSnapshot {
            header: SnapshotHeader::new(),
            record: self.create_tag(resolver)?,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore the storage from a binary save produced by [`to_bytes`](Self::to_bytes).
    pub fn read_bytes(
        &self,
        data: &[u8],
        resolver: &impl ResourceResolver<R>,
    ) -> Result<(), DeserializeError> {
        let snapshot: StorageSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        self.read_tag(&snapshot.record, resolver)
    }
}
