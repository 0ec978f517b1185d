//! Resolution of layout data into live storages.
//!
//! Resource names in filters are resolved against a [`ResourceResolver`];
//! the result is a ready-to-use [`ResourceStorage`] or energy buffer.

use std::collections::HashSet;
use std::path::Path;

use machinelib_core::access::SlotGroupType;
use machinelib_core::filter::ResourceFilter;
use machinelib_core::group::SlotGroupBuilder;
use machinelib_core::resource::{Fluid, Item, Resource, ResourceResolver};
use machinelib_core::slot::SlotConfig;
use machinelib_core::slotted::SlottedStorage;
use machinelib_core::storage::ResourceStorage;
use machinelib_energy::{EnergyConfig, MachineEnergyStorage};

use crate::loader::{DataLoadError, check_duplicate, deserialize_file, find_data_file, require_data_file};
use crate::schema::*;

// ===========================================================================
// Resolved machine
// ===========================================================================

/// Everything a machine directory declares.
#[derive(Debug)]
pub struct MachineData {
    pub items: ResourceStorage<Item>,
    pub fluids: Option<ResourceStorage<Fluid>>,
    pub energy: Option<MachineEnergyStorage>,
}

// ===========================================================================
// Building from data
// ===========================================================================

fn resolve<R: Resource>(
    name: &str,
    resolver: &impl ResourceResolver<R>,
    location: &str,
) -> Result<R, DataLoadError> {
    resolver.resolve(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        location: location.to_string(),
        name: name.to_string(),
        expected_kind: R::KIND,
    })
}

/// Turn filter data into a predicate, resolving every named resource.
pub fn build_filter<R: Resource>(
    data: &FilterData,
    resolver: &impl ResourceResolver<R>,
    location: &str,
) -> Result<ResourceFilter<R>, DataLoadError> {
    Ok(match data {
        FilterData::Any => ResourceFilter::any(),
        FilterData::None => ResourceFilter::none(),
        FilterData::Resource(name) => ResourceFilter::of_resource(resolve(name, resolver, location)?),
        FilterData::Resources(names) => ResourceFilter::of_resources(
            names
                .iter()
                .map(|name| resolve(name, resolver, location))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        FilterData::Not(inner) => !build_filter(inner, resolver, location)?,
        FilterData::And(parts) => parts.iter().try_fold(ResourceFilter::any(), |acc, part| {
            Ok::<_, DataLoadError>(acc.and(build_filter(part, resolver, location)?))
        })?,
        FilterData::Or(parts) => parts.iter().try_fold(ResourceFilter::none(), |acc, part| {
            Ok::<_, DataLoadError>(acc.or(build_filter(part, resolver, location)?))
        })?,
    })
}

fn build_slot<R: Resource>(
    data: &SlotData,
    resolver: &impl ResourceResolver<R>,
    location: &str,
) -> Result<SlotConfig<R>, DataLoadError> {
    let mut config = SlotConfig::new(data.capacity);
    if let Some(filter) = &data.filter {
        config = config.filter(build_filter(filter, resolver, location)?);
    }
    if let Some(filter) = &data.external_filter {
        config = config.external_filter(build_filter(filter, resolver, location)?);
    }
    if let Some(allowed) = data.player_insertion {
        config = config.player_insertion(allowed);
    }
    Ok(config)
}

fn build_storage_at<R: Resource>(
    layout: &StorageLayoutData,
    resolver: &impl ResourceResolver<R>,
    origin: &str,
) -> Result<ResourceStorage<R>, DataLoadError> {
    let mut seen = HashSet::new();
    let mut builder = ResourceStorage::builder();

    for group in &layout.groups {
        check_duplicate(&mut seen, &group.name, origin)?;
        let location = format!("{origin}: group '{}'", group.name);
        let configs = group
            .slots
            .iter()
            .map(|slot| build_slot(slot, resolver, &location))
            .collect::<Result<Vec<_>, _>>()?;
        let repeat = group.count.unwrap_or(1);

        builder = builder.group(SlotGroupType::new(group.name.as_str(), group.input_type), |g| {
            (0..repeat)
                .flat_map(|_| configs.iter().cloned())
                .fold(g, SlotGroupBuilder::slot)
        });
    }

    Ok(builder.build())
}

/// Build a storage from layout data.
pub fn build_storage<R: Resource>(
    layout: &StorageLayoutData,
    resolver: &impl ResourceResolver<R>,
) -> Result<ResourceStorage<R>, DataLoadError> {
    build_storage_at(layout, resolver, "layout")
}

pub fn build_energy(data: &EnergyData) -> MachineEnergyStorage {
    MachineEnergyStorage::new(
        EnergyConfig::new(data.capacity, data.max_input, data.max_output)
            .exposed_insertion(data.insert)
            .exposed_extraction(data.extract),
    )
}

// ===========================================================================
// Loading from files
// ===========================================================================

/// Load a storage layout file and build it.
pub fn load_storage<R: Resource>(
    path: &Path,
    resolver: &impl ResourceResolver<R>,
) -> Result<ResourceStorage<R>, DataLoadError> {
    let layout: StorageLayoutData = deserialize_file(path)?;
    build_storage_at(&layout, resolver, &path.display().to_string())
}

/// Load an energy buffer definition file.
pub fn load_energy(path: &Path) -> Result<MachineEnergyStorage, DataLoadError> {
    let data: EnergyData = deserialize_file(path)?;
    Ok(build_energy(&data))
}

/// Load a machine directory: `items` (required), `fluids` and `energy`
/// (optional), each in any supported format.
pub fn load_machine(
    dir: &Path,
    items: &impl ResourceResolver<Item>,
    fluids: &impl ResourceResolver<Fluid>,
) -> Result<MachineData, DataLoadError> {
    let item_storage = load_storage(&require_data_file(dir, "items")?, items)?;
    let fluid_storage = find_data_file(dir, "fluids")?
        .map(|path| load_storage(&path, fluids))
        .transpose()?;
    let energy = find_data_file(dir, "energy")?
        .map(|path| load_energy(&path))
        .transpose()?;

    tracing::debug!(
        dir = %dir.display(),
        item_slots = item_storage.size(),
        fluid_slots = fluid_storage.as_ref().map_or(0, |s| s.size()),
        energy = energy.is_some(),
        "machine loaded"
    );

    Ok(MachineData {
        items: item_storage,
        fluids: fluid_storage,
        energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{cleanup, make_test_dir};
    use machinelib_core::access::{InputType, ResourceFlow};
    use machinelib_core::test_utils::*;
    use std::fs;

    fn layout(ron: &str) -> StorageLayoutData {
        ron::from_str(ron).unwrap()
    }

    // -----------------------------------------------------------------------
    // build_filter
    // -----------------------------------------------------------------------

    #[test]
    fn filters_resolve_names() {
        let registry = item_registry();
        let data = FilterData::Or(vec![
            FilterData::Resource("iron_ingot".into()),
            FilterData::And(vec![
                FilterData::Resources(vec!["copper_ingot".into(), "wrench".into()]),
                FilterData::Not(Box::new(FilterData::Resource("wrench".into()))),
            ]),
        ]);
        let filter = build_filter(&data, &registry, "test").unwrap();
        assert!(filter.test(&iron(), None));
        assert!(filter.test(&copper(), None));
        assert!(!filter.test(&wrench(), None));
        assert!(!filter.test(&ender_pearl(), None));
    }

    #[test]
    fn unknown_filter_name_is_unresolved() {
        let data = FilterData::Resource("unobtainium".into());
        let result = build_filter(&data, &item_registry(), "test");
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "item", .. }) if name == "unobtainium"
        ));
    }

    // -----------------------------------------------------------------------
    // build_storage
    // -----------------------------------------------------------------------

    #[test]
    fn storage_follows_layout() {
        let data = layout(
            r#"(groups: [
                (name: "input", input_type: input,
                 slots: [(capacity: 64, filter: Some(Resource("iron_ingot")))]),
                (name: "output", input_type: output, slots: [(capacity: 16)], count: Some(2)),
                (name: "upgrade", input_type: transfer,
                 slots: [(capacity: 1, player_insertion: Some(false))]),
            ])"#,
        );
        let storage = build_storage(&data, &item_registry()).unwrap();

        assert_eq!(storage.size(), 4);
        assert_eq!(storage.groups().len(), 3);
        assert_eq!(storage.group(1).input_type(), InputType::Output);
        assert_eq!(storage.slot(2).capacity(), 16);
        assert!(!storage.slot(3).player_insertion());

        assert_eq!(storage.insert_at(0, &copper(), None, 5, None), 0);
        assert_eq!(storage.exposed(ResourceFlow::Input).insert(&iron(), None, 5, None), 5);
    }

    #[test]
    fn duplicate_group_names_are_rejected() {
        let data = layout(
            r#"(groups: [
                (name: "main", input_type: storage, slots: [(capacity: 64)]),
                (name: "main", input_type: storage, slots: [(capacity: 64)]),
            ])"#,
        );
        let result = build_storage(&data, &item_registry());
        assert!(matches!(result, Err(DataLoadError::DuplicateName { .. })));
    }

    // -----------------------------------------------------------------------
    // load_machine
    // -----------------------------------------------------------------------

    #[test]
    fn load_machine_with_all_files() {
        let dir = make_test_dir("machine_all");
        fs::write(
            dir.join("items.ron"),
            r#"(groups: [(name: "main", input_type: storage, slots: [(capacity: 64)], count: Some(3))])"#,
        )
        .unwrap();
        fs::write(
            dir.join("fluids.toml"),
            "[[groups]]\nname = \"tank\"\ninput_type = \"input\"\n[[groups.slots]]\ncapacity = 81000\nfilter = { Resource = \"water\" }\n",
        )
        .unwrap();
        fs::write(
            dir.join("energy.json"),
            r#"{"capacity": 5000, "max_input": 100, "max_output": 0, "extract": false}"#,
        )
        .unwrap();

        let machine = load_machine(&dir, &item_registry(), &fluid_registry()).unwrap();
        assert_eq!(machine.items.size(), 3);
        let fluids = machine.fluids.unwrap();
        assert_eq!(fluids.insert(&lava(), None, 1000, None), 0);
        assert_eq!(fluids.insert(&water(), None, 1000, None), 1000);
        let energy = machine.energy.unwrap();
        assert_eq!(energy.capacity(), 5000);
        assert!(energy.exposed(ResourceFlow::Output).is_none());

        cleanup(&dir);
    }

    #[test]
    fn load_machine_optional_files_absent() {
        let dir = make_test_dir("machine_items_only");
        fs::write(
            dir.join("items.json"),
            r#"{"groups": [{"name": "main", "input_type": "storage", "slots": [{"capacity": 64}]}]}"#,
        )
        .unwrap();

        let machine = load_machine(&dir, &item_registry(), &fluid_registry()).unwrap();
        assert_eq!(machine.items.size(), 1);
        assert!(machine.fluids.is_none());
        assert!(machine.energy.is_none());

        cleanup(&dir);
    }

    #[test]
    fn load_machine_requires_items() {
        let dir = make_test_dir("machine_missing_items");
        let result = load_machine(&dir, &item_registry(), &fluid_registry());
        assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));
        cleanup(&dir);
    }

    #[test]
    fn unresolved_fluid_names_the_file() {
        let dir = make_test_dir("machine_bad_fluid");
        fs::write(
            dir.join("items.ron"),
            r#"(groups: [(name: "main", input_type: storage, slots: [(capacity: 64)])])"#,
        )
        .unwrap();
        fs::write(
            dir.join("fluids.ron"),
            r#"(groups: [(name: "tank", input_type: storage, slots: [(capacity: 1000, filter: Some(Resource("milk")))])])"#,
        )
        .unwrap();

        let err = load_machine(&dir, &item_registry(), &fluid_registry()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("milk"));
        assert!(msg.contains("fluid"));
        assert!(msg.contains("fluids.ron"));

        cleanup(&dir);
    }
}
