use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Installation mechanism declared by a catalog entry. The set is closed;
/// anything else is carried as `Unknown` so the entry stays auditable but can
/// never be resolved to a backend.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstallMethod {
    None,
    Apt,
    Snap,
    Unknown(String),
}

impl From<String> for InstallMethod {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "none" | "dummy" => Self::None,
            "apt" => Self::Apt,
            "snap" => Self::Snap,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<InstallMethod> for String {
    fn from(method: InstallMethod) -> Self {
        match method {
            InstallMethod::None => "none".to_string(),
            InstallMethod::Apt => "apt".to_string(),
            InstallMethod::Snap => "snap".to_string(),
            InstallMethod::Unknown(raw) => raw,
        }
    }
}

/// Where apt packages for a directive come from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PackageSource {
    /// A named archive component such as "universe". Whether the name is in
    /// the known vocabulary is the compiler's concern, not the parser's.
    Component(String),
    Ppa(String),
    Manual,
}

impl PackageSource {
    pub fn parse(raw: &str) -> Self {
        if raw == "manual" {
            Self::Manual
        } else if let Some(reference) = raw.strip_prefix("ppa:") {
            Self::Ppa(reference.to_string())
        } else {
            Self::Component(raw.to_string())
        }
    }
}

/// One per-codename instruction block. Fields beyond `main_package` and the
/// package lists only apply to the apt method; the compiler enforces
/// presence, the store stays lenient so already-compiled catalogs load.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallDirective {
    #[serde(default)]
    pub main_package: String,
    #[serde(default)]
    pub install_packages: Vec<String>,
    #[serde(default)]
    pub remove_packages: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_key_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_key_server: Option<String>,
}

impl InstallDirective {
    pub fn package_source(&self) -> Option<PackageSource> {
        self.source.as_deref().map(PackageSource::parse)
    }
}

/// One catalog entry, as stored in the compiled index. `category` and `id`
/// are positional in the catalog JSON and filled in after deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppRecord {
    #[serde(skip)]
    pub category: String,
    #[serde(skip)]
    pub id: String,
    #[serde(default = "listed_default")]
    pub listed: bool,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub developer_name: String,
    pub developer_url: String,
    #[serde(default)]
    pub proprietary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_cmd: Option<String>,
    #[serde(default)]
    pub arch: BTreeSet<String>,
    #[serde(default)]
    pub releases: BTreeSet<String>,
    pub method: InstallMethod,
    #[serde(default)]
    pub installation: BTreeMap<String, InstallDirective>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_remove: Vec<String>,
}

fn listed_default() -> bool {
    true
}

impl AppRecord {
    pub fn uuid(&self) -> String {
        format!("{}-{}", self.category, self.id)
    }

    /// Picks the instruction block for the running system's codename.
    ///
    /// Keys are comma-joined codename sets. A key naming the codename beats
    /// the `all` sentinel; if several keys name it (malformed catalog), the
    /// last match in lexical key order wins, which `BTreeMap` iteration
    /// makes deterministic.
    pub fn resolve_directive(&self, codename: &str) -> Option<&InstallDirective> {
        let mut matched = None;
        for (key, directive) in &self.installation {
            if key == "all" {
                continue;
            }
            if key.split(',').map(str::trim).any(|token| token == codename) {
                matched = Some(directive);
            }
        }
        matched.or_else(|| self.installation.get("all"))
    }

    /// Relative path of the compiled icon asset.
    pub fn icon_relpath(&self) -> String {
        format!("icons/{}.png", self.id)
    }

    /// Relative paths of the first `count` compiled screenshot assets.
    pub fn screenshot_relpaths(&self, count: usize) -> Vec<String> {
        (1..=count)
            .map(|n| format!("screenshots/{}-{}.jpg", self.id, n))
            .collect()
    }

    /// Whether the entry is usable on the given architecture and release.
    pub fn supports(&self, arch: &str, codename: &str) -> bool {
        self.arch.contains(arch) && self.releases.contains(codename)
    }
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{AppRecord, InstallDirective, InstallMethod, PackageSource};

    fn record_with_keys(keys: &[&str]) -> AppRecord {
        let mut installation = BTreeMap::new();
        for key in keys {
            installation.insert(
                key.to_string(),
                InstallDirective {
                    main_package: format!("pkg-{key}"),
                    ..InstallDirective::default()
                },
            );
        }
        AppRecord {
            category: "accessories".to_string(),
            id: "calc".to_string(),
            listed: true,
            name: "Calc".to_string(),
            summary: String::new(),
            description: String::new(),
            tags: Default::default(),
            developer_name: "Dev".to_string(),
            developer_url: "https://example.com".to_string(),
            proprietary: false,
            alternate_to: None,
            launch_cmd: None,
            arch: Default::default(),
            releases: Default::default(),
            method: InstallMethod::Apt,
            installation,
            post_install: Vec::new(),
            post_remove: Vec::new(),
        }
    }

    #[test]
    fn single_key_naming_the_codename_wins_over_all() {
        let record = record_with_keys(&["all", "xenial,zesty"]);
        let directive = record.resolve_directive("zesty").unwrap();
        assert_eq!(directive.main_package, "pkg-xenial,zesty");
    }

    #[test]
    fn unnamed_codename_falls_back_to_all() {
        let record = record_with_keys(&["all", "xenial"]);
        let directive = record.resolve_directive("artful").unwrap();
        assert_eq!(directive.main_package, "pkg-all");
    }

    #[test]
    fn no_matching_key_and_no_all_resolves_to_none() {
        let record = record_with_keys(&["xenial"]);
        assert!(record.resolve_directive("artful").is_none());
    }

    #[test]
    fn overlapping_keys_tie_break_on_last_lexical_match() {
        // Malformed but possible: "zesty" appears in two keys. BTreeMap
        // iterates lexically, so "xenial,zesty" is visited after "artful,zesty"
        // and must win.
        let record = record_with_keys(&["artful,zesty", "xenial,zesty"]);
        let directive = record.resolve_directive("zesty").unwrap();
        assert_eq!(directive.main_package, "pkg-xenial,zesty");
    }

    #[test]
    fn codename_tokens_are_trimmed() {
        let record = record_with_keys(&["xenial, zesty"]);
        let directive = record.resolve_directive("zesty").unwrap();
        assert_eq!(directive.main_package, "pkg-xenial, zesty");
    }

    #[test]
    fn method_round_trips_through_strings() {
        assert_eq!(InstallMethod::from("apt".to_string()), InstallMethod::Apt);
        assert_eq!(InstallMethod::from("dummy".to_string()), InstallMethod::None);
        assert_eq!(
            InstallMethod::from("flatpak".to_string()),
            InstallMethod::Unknown("flatpak".to_string())
        );
        assert_eq!(String::from(InstallMethod::Snap), "snap");
    }

    #[test]
    fn package_source_parse_variants() {
        assert_eq!(
            PackageSource::parse("universe"),
            PackageSource::Component("universe".to_string())
        );
        assert_eq!(
            PackageSource::parse("ppa:org/name"),
            PackageSource::Ppa("org/name".to_string())
        );
        assert_eq!(PackageSource::parse("manual"), PackageSource::Manual);
    }

    #[test]
    fn uuid_joins_category_and_id() {
        let record = record_with_keys(&["all"]);
        assert_eq!(record.uuid(), "accessories-calc");
    }
}
