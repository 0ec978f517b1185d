//! Data-driven machine storage layouts for MachineLib.
//!
//! Layouts (slot groups, capacities, filters, access policy) and energy
//! buffer specs are read from RON, TOML or JSON files and resolved against
//! a resource registry into live storages.

pub mod loader;
pub mod machine;
pub mod schema;

pub use loader::DataLoadError;
pub use machine::{MachineData, build_storage, load_machine, load_storage};
