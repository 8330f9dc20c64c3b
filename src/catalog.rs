//! Building catalog and resource emojis
//!
//! Both are loaded once at startup from JSON files and shared read-only.
//! A missing or malformed file degrades to an empty catalog (or emoji map)
//! instead of aborting startup; commands then report the data as unavailable.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON object at the top level")]
    NotAnObject,
    #[error("Building {0} is not an object")]
    InvalidBuilding(String),
    #[error("Building {building} has invalid requirement {resource}: {value}")]
    InvalidRequirement {
        building: String,
        resource: String,
        value: Value,
    },
}

/// One resource requirement of a building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Resource key as stored in profiles (lowercase)
    pub resource: String,
    pub amount: i64,
}

/// A constructible building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Requirements in file order
    pub requirements: Vec<Requirement>,
}

/// Immutable, ordered list of buildings
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buildings: Vec<Building>,
}

const RESERVED_KEYS: [&str; 2] = ["id", "description"];

impl Catalog {
    pub fn new(buildings: Vec<Building>) -> Self {
        Self { buildings }
    }

    /// Parse the `buildings.json` format: name -> {id, description, resource: amount...}
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let root: Value = serde_json::from_str(text)?;
        let Value::Object(entries) = root else {
            return Err(CatalogError::NotAnObject);
        };

        let buildings = entries
            .into_iter()
            .map(|(name, body)| match body {
                Value::Object(fields) => parse_building(name, fields),
                _ => Err(CatalogError::InvalidBuilding(name)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { buildings })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Load the catalog, falling back to an empty one on any failure
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(catalog) => {
                tracing::info!(
                    path = %path.display(),
                    buildings = catalog.len(),
                    "Loaded building catalog"
                );
                catalog
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error loading buildings");
                Self::default()
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&Building> {
        self.buildings.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.name == name)
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

fn parse_building(name: String, fields: Map<String, Value>) -> Result<Building, CatalogError> {
    let id = fields
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .unwrap_or(0);
    let description = fields
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("No description available.")
        .to_string();

    let mut requirements = Vec::new();
    for (key, value) in fields {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match value.as_i64() {
            Some(amount) if amount >= 0 => requirements.push(Requirement {
                resource: key.to_lowercase(),
                amount,
            }),
            _ => {
                return Err(CatalogError::InvalidRequirement {
                    building: name,
                    resource: key,
                    value,
                })
            }
        }
    }

    Ok(Building {
        id,
        name,
        description,
        requirements,
    })
}

/// Resource name -> emoji shown next to it
#[derive(Debug, Clone, Default)]
pub struct Emojis {
    map: HashMap<String, String>,
}

impl Emojis {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let map: HashMap<String, String> = serde_json::from_str(&text)?;
        Ok(Self { map })
    }

    /// Load emojis, falling back to the built-in profile set on failure
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::error!(path = %path.display(), error = %e, "Error loading emojis");
            Self::fallback()
        })
    }

    /// Emojis used when the data file is unavailable
    pub fn fallback() -> Self {
        let map = [
            ("experience", "✨"),
            ("gold", "💰"),
            ("steel", "⚙️"),
            ("oil", "🛢️"),
            ("food", "🍗"),
            ("intel", "🔍"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { map }
    }

    /// Emoji for a resource, empty when unknown
    pub fn get(&self, resource: &str) -> &str {
        self.map
            .get(&resource.to_lowercase())
            .map_or("", String::as_str)
    }
}
