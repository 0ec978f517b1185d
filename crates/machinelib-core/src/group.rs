use crate::access::{InputType, SlotGroupType};
use crate::modification::ModificationTracker;
use crate::resource::Resource;
use crate::slot::{ResourceSlot, SlotConfig};
use crate::slotted::SlottedStorage;
use std::rc::Rc;

/// Collects slot configurations for one group. Every slot added here takes
/// the group's input type.
#[derive(Debug)]
pub struct SlotGroupBuilder<R> {
    input_type: InputType,
    slots: Vec<SlotConfig<R>>,
}

impl<R: Resource> SlotGroupBuilder<R> {
    pub(crate) fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            slots: Vec::new(),
        }
    }

    pub fn slot(mut self, config: SlotConfig<R>) -> Self {
        self.slots.push(config.input_type(self.input_type));
        self
    }

    /// Add `count` slots sharing one configuration.
    pub fn slots(mut self, count: usize, config: SlotConfig<R>) -> Self {
        let config = config.input_type(self.input_type);
        self.slots.extend(std::iter::repeat_n(config, count));
        self
    }

    pub(crate) fn into_configs(self) -> Vec<SlotConfig<R>> {
        self.slots
    }
}

/// An ordered run of slots sharing one access policy.
#[derive(Debug)]
pub struct SlotGroup<R: Resource> {
    group_type: SlotGroupType,
    slots: Box<[ResourceSlot<R>]>,
    tracker: Rc<ModificationTracker>,
}

impl<R: Resource> SlotGroup<R> {
    /// A standalone group with its own root tracker.
    pub fn new(
        group_type: SlotGroupType,
        build: impl FnOnce(SlotGroupBuilder<R>) -> SlotGroupBuilder<R>,
    ) -> Self {
        Self::with_tracker(group_type, build, ModificationTracker::new())
    }

    pub(crate) fn with_parent(
        group_type: SlotGroupType,
        configs: Vec<SlotConfig<R>>,
        parent: &Rc<ModificationTracker>,
    ) -> Self {
        let tracker = ModificationTracker::with_parent(parent);
        Self::from_configs(group_type, configs, tracker)
    }

    fn with_tracker(
        group_type: SlotGroupType,
        build: impl FnOnce(SlotGroupBuilder<R>) -> SlotGroupBuilder<R>,
        tracker: Rc<ModificationTracker>,
    ) -> Self {
        let configs = build(SlotGroupBuilder::new(group_type.input_type())).into_configs();
        Self::from_configs(group_type, configs, tracker)
    }

    fn from_configs(
        group_type: SlotGroupType,
        configs: Vec<SlotConfig<R>>,
        tracker: Rc<ModificationTracker>,
    ) -> Self {
        let slots = configs
            .into_iter()
            .map(|config| ResourceSlot::with_parent(config, &tracker))
            .collect();
        Self {
            group_type,
            slots,
            tracker,
        }
    }

    pub fn group_type(&self) -> &SlotGroupType {
        &self.group_type
    }

    pub fn name(&self) -> &str {
        self.group_type.name()
    }

    pub fn input_type(&self) -> InputType {
        self.group_type.input_type()
    }

    pub fn slots(&self) -> &[ResourceSlot<R>] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceSlot<R>> {
        self.slots.iter()
    }

    /// Called after every change to this group that is not rolled back.
    pub fn set_listener(&self, listener: impl Fn() + 'static) {
        self.tracker.set_listener(listener);
    }
}

impl<R: Resource> SlottedStorage<R> for SlotGroup<R> {
    fn size(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: usize) -> &ResourceSlot<R> {
        assert!(
            index < self.slots.len(),
            "slot index {index} out of range for group '{}' of {} slots",
            self.name(),
            self.slots.len()
        );
        &self.slots[index]
    }

    fn modifications(&self) -> i64 {
        self.tracker.modifications()
    }
}

impl<'a, R: Resource> IntoIterator for &'a SlotGroup<R> {
    type Item = &'a ResourceSlot<R>;
    type IntoIter = std::slice::Iter<'a, ResourceSlot<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
