use crate::resource::Resource;
use crate::slot::ResourceSlot;
use crate::slotted::SlottedStorage;
use std::marker::PhantomData;

#[derive(Debug, Clone)]
enum IndexMap {
    Range { start: usize, len: usize },
    Indices(Box<[usize]>),
}

impl IndexMap {
    fn len(&self) -> usize {
        match self {
            IndexMap::Range { len, .. } => *len,
            IndexMap::Indices(indices) => indices.len(),
        }
    }

    fn get(&self, index: usize) -> Option<usize> {
        match self {
            IndexMap::Range { start, len } => (index < *len).then(|| start + index),
            IndexMap::Indices(indices) => indices.get(index).copied(),
        }
    }
}

/// A borrowed view onto some of another storage's slots.
///
/// Index `i` of the view maps to a fixed parent index. The slots are the
/// parent's own, so changes through the view are visible through the parent
/// immediately and the other way round.
#[derive(Debug)]
pub struct SubStorage<'a, R, S: ?Sized> {
    parent: &'a S,
    map: IndexMap,
    _resource: PhantomData<fn() -> R>,
}

impl<'a, R: Resource, S: SlottedStorage<R> + ?Sized> SubStorage<'a, R, S> {
    /// View `len` consecutive slots starting at `start`. Panics if the range
    /// exceeds the parent.
    pub fn range(parent: &'a S, start: usize, len: usize) -> Self {
        let size = parent.size();
        assert!(
            start.checked_add(len).is_some_and(|end| end <= size),
            "sub-storage range {start}..{} out of bounds for storage of {size} slots",
            start.saturating_add(len)
        );
        Self {
            parent,
            map: IndexMap::Range { start, len },
            _resource: PhantomData,
        }
    }

    /// View the parent slots at `indices`, in the given order. Panics if any
    /// index is out of range.
    pub fn indices(parent: &'a S, indices: &[usize]) -> Self {
        let size = parent.size();
        if let Some(bad) = indices.iter().find(|&&i| i >= size) {
            panic!("sub-storage index {bad} out of bounds for storage of {size} slots");
        }
        Self {
            parent,
            map: IndexMap::Indices(indices.into()),
            _resource: PhantomData,
        }
    }

    pub fn parent(&self) -> &'a S {
        self.parent
    }

    /// The parent index that view index `index` refers to.
    pub fn parent_index(&self, index: usize) -> usize {
        match self.map.get(index) {
            Some(i) => i,
            None => panic!(
                "slot index {index} out of range for sub-storage of {} slots",
                self.map.len()
            ),
        }
    }
}

impl<R: Resource, S: SlottedStorage<R> + ?Sized> SlottedStorage<R> for SubStorage<'_, R, S> {
    fn size(&self) -> usize {
        self.map.len()
    }

    fn slot(&self, index: usize) -> &ResourceSlot<R> {
        self.parent.slot(self.parent_index(index))
    }

    fn modifications(&self) -> i64 {
        self.iter_slots().map(ResourceSlot::modifications).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::transaction::Transaction;

    #[test]
    fn range_maps_to_parent() {
        let storage = item_storage(5, 64);
        let view = storage.sub_storage(2, 2);
        assert_eq!(view.size(), 2);
        assert_eq!(view.parent_index(0), 2);
        view.insert(&iron(), None, 70, None);
        assert_eq!(storage.amount(2), 64);
        assert_eq!(storage.amount(3), 6);
        assert_eq!(storage.amount(0), 0);
    }

    #[test]
    fn parent_changes_visible_through_view() {
        let storage = item_storage(4, 64);
        let view = storage.sub_storage_indices(&[3, 1]);
        storage.insert_at(3, &copper(), None, 9, None);
        assert_eq!(view.amount(0), 9);
        assert_eq!(view.resource(0), Some(copper()));
        assert_eq!(view.modifications(), 1);
    }

    #[test]
    fn indices_sweep_in_given_order() {
        let storage = item_storage(4, 10);
        let view = storage.sub_storage_indices(&[3, 0]);
        assert_eq!(view.insert(&iron(), None, 15, None), 15);
        assert_eq!(storage.amount(3), 10);
        assert_eq!(storage.amount(0), 5);
    }

    #[test]
    fn nested_views_compose() {
        let storage = item_storage(6, 64);
        let outer = storage.sub_storage(1, 4);
        let inner = outer.sub_storage(2, 2);
        assert_eq!(outer.parent_index(inner.parent_index(0)), 3);
        inner.insert_at(1, &iron(), None, 1, None);
        assert_eq!(storage.amount(4), 1);
    }

    #[test]
    fn view_mutations_roll_back_with_parent() {
        let storage = item_storage(3, 64);
        let view = storage.sub_storage(1, 2);
        let tx = Transaction::open_outer();
        view.insert(&iron(), None, 10, Some(&tx));
        tx.abort();
        assert!(SlottedStorage::is_empty(&storage));
    }

    #[test]
    fn empty_range_at_end_is_allowed() {
        let storage = item_storage(3, 64);
        let view = storage.sub_storage(3, 0);
        assert_eq!(view.size(), 0);
        assert_eq!(view.insert(&iron(), None, 5, None), 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn range_past_end_panics() {
        let storage = item_storage(3, 64);
        let _ = storage.sub_storage(2, 2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn bad_index_panics() {
        let storage = item_storage(3, 64);
        let _ = storage.sub_storage_indices(&[0, 3]);
    }

    #[test]
    #[should_panic(expected = "out of range for sub-storage")]
    fn view_index_out_of_range_panics() {
        let storage = item_storage(3, 64);
        let view = storage.sub_storage(0, 2);
        let _ = view.slot(2);
    }
}
