// 📋 House Census - Members of an entity grouped into houses
// The caller side of the grouping engine: fetch members, group, label.

use serde::{Deserialize, Serialize};

use crate::entities::ResidentialRegistry;
use crate::error::ConsoleResult;
use crate::grouping::{HouseGrouping, HouseGroupingEngine};
use crate::source::ResidentialDirectory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseCensus {
    pub entity_id: String,
    pub entity_label: String,

    /// Member records fetched (all roles)
    pub members: usize,

    pub houses: HouseGrouping,
}

impl HouseCensus {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} houses, {} grouped residents, {} excluded records",
            self.entity_label,
            self.houses.house_count(),
            self.houses.total_members(),
            self.houses.excluded
        )
    }
}

/// Group the members of one entity
pub fn house_census<D: ResidentialDirectory>(
    directory: &D,
    entity_id: &str,
    engine: &HouseGroupingEngine,
) -> ConsoleResult<HouseCensus> {
    let registry = ResidentialRegistry::from_entities(directory.fetch_entity_list()?);
    let entity = registry.require(entity_id)?;
    let members = directory.fetch_members(entity_id)?;

    Ok(HouseCensus {
        entity_id: entity.id.clone(),
        entity_label: registry.label_for(entity_id),
        members: members.len(),
        houses: engine.group_houses(&members),
    })
}

/// Census of every entity; entities whose members cannot be read are
/// logged and left out
pub fn census_all<D: ResidentialDirectory>(
    directory: &D,
    engine: &HouseGroupingEngine,
) -> ConsoleResult<Vec<HouseCensus>> {
    let registry = ResidentialRegistry::from_entities(directory.fetch_entity_list()?);
    let mut censuses = Vec::with_capacity(registry.len());

    for entity in registry.entities() {
        match directory.fetch_members(&entity.id) {
            Ok(members) => censuses.push(HouseCensus {
                entity_id: entity.id.clone(),
                entity_label: registry.label_for(&entity.id),
                members: members.len(),
                houses: engine.group_houses(&members),
            }),
            Err(e) => {
                tracing::warn!(entity_id = %entity.id, error = %e, "skipping census for entity");
            }
        }
    }

    Ok(censuses)
}
