use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::normalize::is_blank;

/// Role value that makes a user record take part in house grouping
pub const DEFAULT_RESIDENT_ROLE: &str = "resident";

/// User record as stored by the residential backend.
/// Only the house-identifying fields and the role matter for grouping;
/// every text field may be missing or dirty.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ResidentRecord {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "fullName", default)]
    pub full_name: String,

    /// Structured house identifier (e.g. "A-12"), often absent
    #[serde(rename = "houseID", default)]
    pub house_id: String,

    /// Street name, free text
    #[serde(rename = "calle", default)]
    pub street: String,

    #[serde(rename = "houseNumber", default)]
    pub house_number: String,

    #[serde(default)]
    pub role: String,

    #[serde(rename = "residencialID", default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub residential_id: String,
}

impl ResidentRecord {
    /// Resident with the given house fields (mostly for tests and demos)
    pub fn resident(house_id: &str, street: &str, house_number: &str) -> Self {
        ResidentRecord {
            house_id: house_id.to_string(),
            street: street.to_string(),
            house_number: house_number.to_string(),
            role: DEFAULT_RESIDENT_ROLE.to_string(),
            ..Default::default()
        }
    }

    pub fn is_resident(&self) -> bool {
        self.has_role(DEFAULT_RESIDENT_ROLE)
    }

    /// Case-insensitive role check
    pub fn has_role(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role.trim())
    }

    /// True when at least one of houseID, houseNumber or street carries text
    pub fn has_house_identity(&self) -> bool {
        !is_blank(&self.house_id) || !is_blank(&self.house_number) || !is_blank(&self.street)
    }
}

/// Load resident records from a CSV export (header names match the JSON fields)
pub fn load_csv(csv_path: &Path) -> Result<Vec<ResidentRecord>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: ResidentRecord = result.context("Failed to deserialize resident record")?;
        records.push(record);
    }

    tracing::debug!(path = ?csv_path, count = records.len(), "loaded residents from CSV");
    Ok(records)
}

/// Load resident records from a JSON array
pub fn load_json(json_path: &Path) -> Result<Vec<ResidentRecord>> {
    let content = fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read residents file: {:?}", json_path))?;

    let records: Vec<ResidentRecord> =
        serde_json::from_str(&content).context("Failed to parse residents JSON")?;

    tracing::debug!(path = ?json_path, count = records.len(), "loaded residents from JSON");
    Ok(records)
}

/// Pick the loader from the file extension (`.csv`, anything else is JSON)
pub fn load_residents(path: &Path) -> Result<Vec<ResidentRecord>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_csv(path),
        _ => load_json(path),
    }
}
