//! Compiled-catalog store: loads the JSON index and exposes typed records.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::distro::DistroInfo;
use crate::models::{AppRecord, EngineError, EngineErrorKind, EngineResult};

/// Reserved top-level key carrying aggregate statistics.
pub const STATS_KEY: &str = "stats";
/// Reserved top-level key carrying the display block for the distribution.
pub const DISTRO_KEY: &str = "distro";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub categories: u64,
    pub apps: u64,
    /// Unix timestamp of the compilation run.
    pub compiled: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    categories: BTreeMap<String, BTreeMap<String, AppRecord>>,
    pub stats: Option<CatalogStats>,
    pub distro: Option<DistroInfo>,
}

impl Catalog {
    /// Degraded-mode catalog with nothing in it. Whether a missing catalog
    /// file is fatal is the caller's decision, not the store's.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            let kind = if error.kind() == io::ErrorKind::NotFound {
                EngineErrorKind::CatalogMissing
            } else {
                EngineErrorKind::CatalogCorrupt
            };
            EngineError::new(kind, format!("{}: {error}", path.display()))
        })?;

        let value: Value = serde_json::from_str(&raw).map_err(|error| {
            EngineError::new(
                EngineErrorKind::CatalogCorrupt,
                format!("{}: not valid JSON: {error}", path.display()),
            )
        })?;

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> EngineResult<Self> {
        let Value::Object(top) = value else {
            return Err(EngineError::new(
                EngineErrorKind::CatalogSchemaMismatch,
                "catalog root is not an object",
            ));
        };

        let mut catalog = Self::empty();
        for (key, entry) in top {
            match key.as_str() {
                STATS_KEY => {
                    catalog.stats = Some(serde_json::from_value(entry).map_err(|error| {
                        EngineError::new(
                            EngineErrorKind::CatalogSchemaMismatch,
                            format!("invalid stats block: {error}"),
                        )
                    })?);
                }
                DISTRO_KEY => {
                    catalog.distro = Some(serde_json::from_value(entry).map_err(|error| {
                        EngineError::new(
                            EngineErrorKind::CatalogSchemaMismatch,
                            format!("invalid distro block: {error}"),
                        )
                    })?);
                }
                _ => {
                    let apps = parse_category(&key, entry)?;
                    catalog.categories.insert(key, apps);
                }
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, category: &str, app_id: &str) -> Option<&AppRecord> {
        self.categories.get(category)?.get(app_id)
    }

    /// Apps in a category, lexical by app id. An unknown category is an
    /// empty listing, not an error.
    pub fn list_category(&self, category: &str) -> Vec<&AppRecord> {
        self.categories
            .get(category)
            .map(|apps| apps.values().collect())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn app_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.app_count() == 0
    }
}

fn parse_category(category: &str, entry: Value) -> EngineResult<BTreeMap<String, AppRecord>> {
    let Value::Object(apps) = entry else {
        return Err(EngineError::new(
            EngineErrorKind::CatalogSchemaMismatch,
            format!("category '{category}' is not an object"),
        ));
    };

    let mut parsed = BTreeMap::new();
    for (app_id, fields) in apps {
        let mut record: AppRecord = serde_json::from_value(fields).map_err(|error| {
            EngineError::for_app(
                format!("{category}-{app_id}"),
                EngineErrorKind::CatalogSchemaMismatch,
                format!("invalid app record: {error}"),
            )
        })?;
        record.category = category.to_string();
        record.id = app_id.clone();
        parsed.insert(app_id, record);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use serde_json::json;

    use super::Catalog;
    use crate::models::{EngineErrorKind, InstallMethod};

    fn sample_index() -> serde_json::Value {
        json!({
            "accessories": {
                "calc": {
                    "listed": true,
                    "name": "Calc",
                    "summary": "A calculator",
                    "description": "Counts things.",
                    "developer-name": "Example",
                    "developer-url": "https://example.com",
                    "tags": ["maths"],
                    "proprietary": false,
                    "arch": ["amd64"],
                    "releases": ["bionic"],
                    "method": "apt",
                    "installation": {
                        "all": {
                            "main-package": "calc",
                            "install-packages": ["calc"],
                            "remove-packages": ["calc"],
                            "source": "universe"
                        }
                    }
                },
                "abacus": {
                    "name": "Abacus",
                    "developer-name": "Example",
                    "developer-url": "https://example.com",
                    "method": "snap",
                    "installation": { "all": { "main-package": "abacus" } }
                }
            },
            "stats": { "categories": 1, "apps": 2, "compiled": 1_700_000_000u64 },
            "distro": {
                "name": "Ubuntu MATE",
                "info_url": "https://ubuntu-mate.org",
                "support_url": "https://ubuntu-mate.community"
            }
        })
    }

    #[test]
    fn loads_categories_and_reserved_keys() {
        let catalog = Catalog::from_value(sample_index()).unwrap();
        assert_eq!(catalog.app_count(), 2);
        assert_eq!(catalog.stats.unwrap().apps, 2);
        assert_eq!(catalog.distro.as_ref().unwrap().name, "Ubuntu MATE");

        let calc = catalog.get("accessories", "calc").unwrap();
        assert_eq!(calc.uuid(), "accessories-calc");
        assert_eq!(calc.method, InstallMethod::Apt);
        assert_eq!(
            calc.resolve_directive("bionic").unwrap().main_package,
            "calc"
        );
    }

    #[test]
    fn category_listing_is_lexical() {
        let catalog = Catalog::from_value(sample_index()).unwrap();
        let ids: Vec<&str> = catalog
            .list_category("accessories")
            .into_iter()
            .map(|app| app.id.as_str())
            .collect();
        assert_eq!(ids, ["abacus", "calc"]);
        assert!(catalog.list_category("games").is_empty());
    }

    #[test]
    fn missing_file_is_distinguished_from_corrupt() {
        let missing = Catalog::load(Path::new("/nonexistent/applications.json")).unwrap_err();
        assert_eq!(missing.kind, EngineErrorKind::CatalogMissing);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let corrupt = Catalog::load(file.path()).unwrap_err();
        assert_eq!(corrupt.kind, EngineErrorKind::CatalogCorrupt);
    }

    #[test]
    fn wrong_shape_is_a_schema_mismatch() {
        let error = Catalog::from_value(json!({ "accessories": [] })).unwrap_err();
        assert_eq!(error.kind, EngineErrorKind::CatalogSchemaMismatch);

        // Missing required field on an entry.
        let error = Catalog::from_value(json!({
            "accessories": { "calc": { "method": "apt" } }
        }))
        .unwrap_err();
        assert_eq!(error.kind, EngineErrorKind::CatalogSchemaMismatch);
        assert_eq!(error.app.as_deref(), Some("accessories-calc"));
    }

    #[test]
    fn unknown_method_still_loads() {
        let catalog = Catalog::from_value(json!({
            "accessories": {
                "odd": {
                    "name": "Odd",
                    "developer-name": "Example",
                    "developer-url": "https://example.com",
                    "method": "flatpak"
                }
            }
        }))
        .unwrap();
        let odd = catalog.get("accessories", "odd").unwrap();
        assert_eq!(odd.method, InstallMethod::Unknown("flatpak".to_string()));
    }
}
