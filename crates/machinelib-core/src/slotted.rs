use crate::access::ResourceFlow;
use crate::exposed::ExposedStorage;
use crate::resource::Resource;
use crate::slot::ResourceSlot;
use crate::sub_storage::SubStorage;
use crate::tag::Tag;
use crate::transaction::Transaction;

/// An ordered sequence of slots with aggregate operations.
///
/// Implementors provide [`size`](SlottedStorage::size) and
/// [`slot`](SlottedStorage::slot); everything else is derived. Aggregate
/// insertion and extraction sweep slots left to right, taking what each slot
/// accepts until the requested amount is reached.
pub trait SlottedStorage<R: Resource> {
    fn size(&self) -> usize;

    /// The slot at `index`. Panics if `index >= size()`.
    fn slot(&self, index: usize) -> &ResourceSlot<R>;

    /// Sum of the slots' modification counters, or the owner's tracker count.
    fn modifications(&self) -> i64;

    fn iter_slots(&self) -> impl Iterator<Item = &ResourceSlot<R>> {
        (0..self.size()).map(move |i| self.slot(i))
    }

    fn is_empty(&self) -> bool {
        self.iter_slots().all(ResourceSlot::is_empty)
    }

    fn is_full(&self) -> bool {
        self.iter_slots().all(ResourceSlot::is_full)
    }

    // -- insertion ----------------------------------------------------------

    /// Dry run of [`insert`](SlottedStorage::insert).
    fn try_insert(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> u64 {
        let mut inserted = 0;
        for slot in self.iter_slots() {
            if inserted == amount {
                break;
            }
            inserted += slot.try_insert(resource, tag, amount - inserted);
        }
        inserted
    }

    /// Whether all of `amount` would fit.
    fn can_insert(&self, resource: &R, tag: Option<&Tag>, amount: u64) -> bool {
        self.try_insert(resource, tag, amount) == amount
    }

    fn insert(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        let mut inserted = 0;
        for slot in self.iter_slots() {
            if inserted == amount {
                break;
            }
            inserted += slot.insert(resource, tag, amount - inserted, transaction);
        }
        inserted
    }

    /// Top up slots already holding `(resource, tag)` first, then fall back
    /// to a general sweep for the remainder.
    fn insert_matching(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        let mut inserted = 0;
        for slot in self.iter_slots() {
            if inserted == amount {
                return inserted;
            }
            if slot.contains_exact(resource, tag) {
                inserted += slot.insert(resource, tag, amount - inserted, transaction);
            }
        }
        inserted + self.insert(resource, tag, amount - inserted, transaction)
    }

    fn insert_one(&self, resource: &R, tag: Option<&Tag>, transaction: Option<&Transaction<'_>>) -> bool {
        self.iter_slots()
            .any(|slot| slot.insert_one(resource, tag, transaction))
    }

    // -- extraction ---------------------------------------------------------

    /// Dry run of [`extract`](SlottedStorage::extract).
    fn try_extract(&self, resource: &R, amount: u64) -> u64 {
        let mut extracted = 0;
        for slot in self.iter_slots() {
            if extracted == amount {
                break;
            }
            extracted += slot.try_extract(Some(resource), amount - extracted);
        }
        extracted
    }

    fn can_extract(&self, resource: &R, amount: u64) -> bool {
        self.try_extract(resource, amount) == amount
    }

    /// Extract up to `amount` of `resource` with any tag.
    fn extract(&self, resource: &R, amount: u64, transaction: Option<&Transaction<'_>>) -> u64 {
        let mut extracted = 0;
        for slot in self.iter_slots() {
            if extracted == amount {
                break;
            }
            extracted += slot.extract(Some(resource), amount - extracted, transaction);
        }
        extracted
    }

    /// Extract up to `amount` of `resource` carrying exactly `tag`.
    fn extract_exact(
        &self,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        let mut extracted = 0;
        for slot in self.iter_slots() {
            if extracted == amount {
                break;
            }
            extracted += slot.extract_exact(resource, tag, amount - extracted, transaction);
        }
        extracted
    }

    fn extract_one(&self, resource: &R, transaction: Option<&Transaction<'_>>) -> bool {
        self.iter_slots()
            .any(|slot| slot.extract_one(Some(resource), transaction))
    }

    // -- queries ------------------------------------------------------------

    fn contains_any(&self, resource: &R) -> bool {
        self.iter_slots().any(|slot| slot.contains(resource))
    }

    /// Total amount of `resource` across all slots, any tag.
    fn count(&self, resource: &R) -> u64 {
        self.iter_slots()
            .filter(|slot| slot.contains(resource))
            .map(ResourceSlot::amount)
            .sum()
    }

    fn count_exact(&self, resource: &R, tag: Option<&Tag>) -> u64 {
        self.iter_slots()
            .filter(|slot| slot.contains_exact(resource, tag))
            .map(ResourceSlot::amount)
            .sum()
    }

    // -- per-index helpers --------------------------------------------------

    fn resource(&self, index: usize) -> Option<R> {
        self.slot(index).resource()
    }

    fn amount(&self, index: usize) -> u64 {
        self.slot(index).amount()
    }

    fn insert_at(
        &self,
        index: usize,
        resource: &R,
        tag: Option<&Tag>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        self.slot(index).insert(resource, tag, amount, transaction)
    }

    fn extract_at(
        &self,
        index: usize,
        resource: Option<&R>,
        amount: u64,
        transaction: Option<&Transaction<'_>>,
    ) -> u64 {
        self.slot(index).extract(resource, amount, transaction)
    }

    // -- views --------------------------------------------------------------

    /// A view of `len` slots starting at `start`.
    fn sub_storage(&self, start: usize, len: usize) -> SubStorage<'_, R, Self>
    where
        Self: Sized,
    {
        SubStorage::range(self, start, len)
    }

    /// A view of the slots at `indices`, in that order.
    fn sub_storage_indices(&self, indices: &[usize]) -> SubStorage<'_, R, Self>
    where
        Self: Sized,
    {
        SubStorage::indices(self, indices)
    }

    /// Automation access through a face with the given flow.
    fn exposed(&self, flow: ResourceFlow) -> ExposedStorage<'_, R, Self>
    where
        Self: Sized,
    {
        ExposedStorage::new(self, flow)
    }
}
