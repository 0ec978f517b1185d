//! Serde data file structs for machine storage layouts.
//!
//! These structs define the on-disk format for slot groups, slot limits,
//! filters and energy buffers. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into live storages by the loader.

use machinelib_core::access::InputType;
use serde::Deserialize;

// ===========================================================================
// Storage layouts
// ===========================================================================

/// The slot groups of one storage, in flat slot order.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageLayoutData {
    pub groups: Vec<GroupData>,
}

/// One slot group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupData {
    pub name: String,
    pub input_type: InputType,
    pub slots: Vec<SlotData>,
    /// Repeat the listed slots this many times. Defaults to once.
    #[serde(default)]
    pub count: Option<usize>,
}

impl GroupData {
    /// Number of slots this group expands to.
    pub fn slot_count(&self) -> usize {
        self.slots.len() * self.count.unwrap_or(1)
    }
}

/// Limits and filters of one slot.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotData {
    pub capacity: u64,
    #[serde(default)]
    pub filter: Option<FilterData>,
    #[serde(default)]
    pub external_filter: Option<FilterData>,
    /// Overrides the group's player insertion policy.
    #[serde(default)]
    pub player_insertion: Option<bool>,
}

/// A resource filter, with resources named by registry key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum FilterData {
    Any,
    None,
    Resource(String),
    Resources(Vec<String>),
    Not(Box<FilterData>),
    And(Vec<FilterData>),
    Or(Vec<FilterData>),
}

// ===========================================================================
// Energy
// ===========================================================================

/// An energy buffer definition.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EnergyData {
    pub capacity: u64,
    pub max_input: u64,
    pub max_output: u64,
    #[serde(default = "default_true")]
    pub insert: bool,
    #[serde(default = "default_true")]
    pub extract: bool,
}

fn default_true() -> bool {
    true
}
