// 🏠 House Grouping Engine - Collapse resident records into houses
// Two strategies: UnionFind (order-independent) and OrderedIndex (legacy parity)
//
// Problem solved:
// - "A-12" on one record, "Calle Juárez 12" on another, both → same house
// - Missing houseID falls back to the normalized street + number
// - Dirty text (case, spacing, accents, zero-width chars) does not split houses

use crate::normalize::{address_key, normalize, sanitize, ADDRESS_KEY_PREFIX};
use crate::residents::{ResidentRecord, DEFAULT_RESIDENT_ROLE};
use crate::union_find::DisjointSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Label for a group whose first record has no usable text at all
pub const UNIDENTIFIED_HOUSE_LABEL: &str = "Casa sin identificar";

/// Node prefix for houseIDs inside the union-find key space
const HOUSE_ID_NODE_PREFIX: &str = "HID::";

// ============================================================================
// GROUPING STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// Connected components over houseID ∪ address identifiers.
    /// The resulting keys do not depend on input order.
    #[default]
    UnionFind,

    /// Two indexes (houseID → key, address → key) filled in input order.
    /// A conflicting key only wins if it was seen earlier, so cross-linked
    /// data can group differently depending on record order.
    OrderedIndex,
}

impl GroupingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingStrategy::UnionFind => "union_find",
            GroupingStrategy::OrderedIndex => "ordered_index",
        }
    }
}

// ============================================================================
// GROUPING RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseGroup {
    /// Canonical key shared by every record of this house
    pub key: String,

    /// Human-readable label, derived from the first member in input order
    pub display_name: String,

    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseGrouping {
    pub strategy: GroupingStrategy,

    /// One entry per house, sorted by key
    pub groups: Vec<HouseGroup>,

    /// Key assigned to each input record (None = excluded)
    pub assignments: Vec<Option<String>>,

    /// Records skipped: not a resident, or no house-identifying field
    pub excluded: usize,
}

impl HouseGrouping {
    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.key.as_str()).collect()
    }

    pub fn member_count(&self, key: &str) -> usize {
        self.groups
            .iter()
            .find(|g| g.key == key)
            .map_or(0, |g| g.member_count)
    }

    /// Group of the record at `index` in the input slice
    pub fn group_for(&self, index: usize) -> Option<&HouseGroup> {
        let key = self.assignments.get(index)?.as_deref()?;
        self.groups.iter().find(|g| g.key == key)
    }

    pub fn total_members(&self) -> usize {
        self.groups.iter().map(|g| g.member_count).sum()
    }

    pub fn house_count(&self) -> usize {
        self.groups.len()
    }
}

// ============================================================================
// HOUSE GROUPING ENGINE
// ============================================================================

/// Key for a normalized houseID. HouseIDs that look like an address key
/// (or like an escaped houseID) get the `HID::` prefix so the two key
/// spaces never overlap.
fn house_id_key(house_id: String) -> String {
    if house_id.starts_with(ADDRESS_KEY_PREFIX) || house_id.starts_with(HOUSE_ID_NODE_PREFIX) {
        format!("{}{}", HOUSE_ID_NODE_PREFIX, house_id)
    } else {
        house_id
    }
}

/// Identifiers of one eligible record, already normalized
struct HouseIdentity {
    house_id: Option<String>,
    address: Option<String>,
}

impl HouseIdentity {
    fn of(record: &ResidentRecord) -> Option<Self> {
        let house_id = Some(normalize(&record.house_id))
            .filter(|h| !h.is_empty())
            .map(house_id_key);
        let address = address_key(&record.street, &record.house_number);

        if house_id.is_none() && address.is_none() {
            return None;
        }

        Some(HouseIdentity { house_id, address })
    }

    /// Key used when nothing has been seen yet: houseID first, address second
    fn tentative_key(&self) -> String {
        self.house_id
            .clone()
            .or_else(|| self.address.clone())
            .unwrap_or_default()
    }
}

pub struct HouseGroupingEngine {
    pub strategy: GroupingStrategy,

    /// Role value a record must carry to be grouped (default: "resident")
    pub resident_role: String,
}

impl HouseGroupingEngine {
    /// Engine with the order-independent strategy
    pub fn new() -> Self {
        Self::with_strategy(GroupingStrategy::default())
    }

    pub fn with_strategy(strategy: GroupingStrategy) -> Self {
        HouseGroupingEngine {
            strategy,
            resident_role: DEFAULT_RESIDENT_ROLE.to_string(),
        }
    }

    /// Group resident records into houses. Never fails: unusable records
    /// are counted in `excluded` instead.
    pub fn group_houses(&self, records: &[ResidentRecord]) -> HouseGrouping {
        let identities: Vec<Option<HouseIdentity>> = records
            .iter()
            .map(|r| {
                if r.has_role(&self.resident_role) && r.has_house_identity() {
                    HouseIdentity::of(r)
                } else {
                    None
                }
            })
            .collect();

        let assignments = match self.strategy {
            GroupingStrategy::UnionFind => Self::assign_union_find(&identities),
            GroupingStrategy::OrderedIndex => Self::assign_ordered_index(&identities),
        };

        let mut groups: BTreeMap<String, HouseGroup> = BTreeMap::new();
        for (record, key) in records.iter().zip(&assignments) {
            let Some(key) = key else { continue };
            groups
                .entry(key.clone())
                .or_insert_with(|| HouseGroup {
                    key: key.clone(),
                    display_name: display_name(record),
                    member_count: 0,
                })
                .member_count += 1;
        }

        let excluded = assignments.iter().filter(|a| a.is_none()).count();
        tracing::debug!(
            strategy = self.strategy.as_str(),
            records = records.len(),
            houses = groups.len(),
            excluded,
            "grouped resident records"
        );

        HouseGrouping {
            strategy: self.strategy,
            groups: groups.into_values().collect(),
            assignments,
            excluded,
        }
    }

    /// Connected components over both identifier spaces.
    /// Canonical key: smallest houseID in the component, else smallest address.
    fn assign_union_find(identities: &[Option<HouseIdentity>]) -> Vec<Option<String>> {
        let mut set = DisjointSet::new();
        let node_of = |identity: &HouseIdentity| -> String {
            match &identity.house_id {
                Some(hid) => format!("{}{}", HOUSE_ID_NODE_PREFIX, hid),
                None => identity.address.clone().unwrap_or_default(),
            }
        };

        for identity in identities.iter().flatten() {
            let node = node_of(identity);
            match (&identity.house_id, &identity.address) {
                (Some(_), Some(address)) => set.union(&node, address),
                _ => {
                    set.insert(&node);
                }
            }
        }

        let mut canonical: HashMap<usize, String> = HashMap::new();
        for component in set.components() {
            let key = component
                .iter()
                .filter_map(|n| n.strip_prefix(HOUSE_ID_NODE_PREFIX))
                .min()
                .map(str::to_string)
                .or_else(|| component.first().cloned());

            if let (Some(key), Some(first)) = (key, component.first()) {
                if let Some(root) = set.find(first) {
                    canonical.insert(root, key);
                }
            }
        }

        identities
            .iter()
            .map(|identity| {
                let identity = identity.as_ref()?;
                let root = set.find(&node_of(identity))?;
                canonical.get(&root).cloned()
            })
            .collect()
    }

    /// Legacy two-index pass. Overrides apply only against keys seen earlier:
    /// an already-seen address wins over a fresh houseID, then an
    /// already-seen houseID wins over that.
    fn assign_ordered_index(identities: &[Option<HouseIdentity>]) -> Vec<Option<String>> {
        let mut by_house_id: HashMap<String, String> = HashMap::new();
        let mut by_address: HashMap<String, String> = HashMap::new();

        identities
            .iter()
            .map(|identity| {
                let identity = identity.as_ref()?;
                let mut key = identity.tentative_key();

                if let Some(seen) = identity.address.as_ref().and_then(|a| by_address.get(a)) {
                    if *seen != key {
                        key = seen.clone();
                    }
                }

                if let Some(seen) = identity.house_id.as_ref().and_then(|h| by_house_id.get(h)) {
                    if *seen != key {
                        key = seen.clone();
                    }
                }

                if let Some(hid) = &identity.house_id {
                    by_house_id.insert(hid.clone(), key.clone());
                }
                if let Some(address) = &identity.address {
                    by_address.entry(address.clone()).or_insert_with(|| key.clone());
                }

                Some(key)
            })
            .collect()
    }
}

impl Default for HouseGroupingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Display label for a record, in priority order:
/// "Casa <houseID>", "<street> <number>", "<street>", "Casa <number>".
pub fn display_name(record: &ResidentRecord) -> String {
    let house_id = sanitize(&record.house_id);
    let street = sanitize(&record.street);
    let number = sanitize(&record.house_number);
    let (house_id, street, number) = (house_id.trim(), street.trim(), number.trim());

    if !house_id.is_empty() {
        format!("Casa {}", house_id)
    } else if !street.is_empty() && !number.is_empty() {
        format!("{} {}", street, number)
    } else if !street.is_empty() {
        street.to_string()
    } else if !number.is_empty() {
        format!("Casa {}", number)
    } else {
        UNIDENTIFIED_HOUSE_LABEL.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
