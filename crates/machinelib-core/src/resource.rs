use crate::id::{FluidTypeId, ItemTypeId};
use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A kind of thing a slot can hold.
///
/// Resources are compared by value. A resource may impose a per-stack limit
/// smaller than a slot's capacity; slots use the tighter of the two.
pub trait Resource: Clone + PartialEq + Debug + 'static {
    /// Human-readable kind, used in diagnostics.
    const KIND: &'static str = "resource";

    /// Per-stack limit, or `None` if only the slot capacity applies.
    fn stack_limit(&self) -> Option<u64> {
        None
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A discrete item type together with its stack size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemTypeId,
    pub max_stack_size: u32,
}

impl Item {
    pub const fn new(id: ItemTypeId, max_stack_size: u32) -> Self {
        Self { id, max_stack_size }
    }
}

impl Resource for Item {
    const KIND: &'static str = "item";

    fn stack_limit(&self) -> Option<u64> {
        Some(u64::from(self.max_stack_size))
    }
}

// ---------------------------------------------------------------------------
// Fluids
// ---------------------------------------------------------------------------

/// A fluid type. Fluid amounts are measured in droplets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fluid(pub FluidTypeId);

impl Fluid {
    pub const DROPLET: u64 = 1;
    pub const NUGGET: u64 = 1_000;
    pub const INGOT: u64 = 9_000;
    pub const BOTTLE: u64 = 27_000;
    pub const BUCKET: u64 = 81_000;
    pub const BLOCK: u64 = 81_000;
}

impl Resource for Fluid {
    const KIND: &'static str = "fluid";
}

// ---------------------------------------------------------------------------
// Stacks
// ---------------------------------------------------------------------------

/// A materialized `(resource, amount, tag)` read out of a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack<R> {
    pub resource: Option<R>,
    pub amount: u64,
    pub tag: Option<Tag>,
}

impl<R: Resource> Stack<R> {
    pub fn new(resource: R, amount: u64, tag: Option<Tag>) -> Self {
        if amount == 0 {
            return Self::empty();
        }
        Self {
            resource: Some(resource),
            amount,
            tag: crate::tag::normalize(tag),
        }
    }

    pub fn empty() -> Self {
        Self {
            resource: None,
            amount: 0,
            tag: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_none()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Maps resources to stable string keys and back. Used by every persistence
/// and wire format; usually backed by a [`Registry`](crate::registry::Registry).
pub trait ResourceResolver<R> {
    fn resource_key(&self, resource: &R) -> Option<String>;

    fn resolve(&self, key: &str) -> Option<R>;
}

impl<R, T: ResourceResolver<R> + ?Sized> ResourceResolver<R> for &T {
    fn resource_key(&self, resource: &R) -> Option<String> {
        (**self).resource_key(resource)
    }

    fn resolve(&self, key: &str) -> Option<R> {
        (**self).resolve(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagValue;

    #[test]
    fn item_stack_limit_is_max_stack_size() {
        let pearl = Item::new(ItemTypeId(3), 16);
        assert_eq!(pearl.stack_limit(), Some(16));
    }

    #[test]
    fn fluids_have_no_stack_limit() {
        assert_eq!(Fluid(FluidTypeId(0)).stack_limit(), None);
        assert_eq!(Fluid::BUCKET, 81_000);
        assert_eq!(Fluid::INGOT * 9, Fluid::BUCKET);
    }

    #[test]
    fn stack_normalizes_empty_tag() {
        let stack = Stack::new(Fluid(FluidTypeId(0)), 10, Some(Tag::new()));
        assert_eq!(stack.tag, None);

        let tagged = Tag::new().with("Temp", TagValue::Int(300));
        let stack = Stack::new(Fluid(FluidTypeId(0)), 10, Some(tagged.clone()));
        assert_eq!(stack.tag, Some(tagged));
    }

    #[test]
    fn zero_amount_stack_is_empty() {
        let stack = Stack::new(Fluid(FluidTypeId(0)), 0, None);
        assert!(stack.is_empty());
        assert_eq!(stack, Stack::empty());
    }
}
