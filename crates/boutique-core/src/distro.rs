//! Vocabulary specific to the distribution shipping the catalog.

use serde::{Deserialize, Serialize};

/// Architectures, as dpkg names them.
pub const KNOWN_ARCH: &[&str] = &["i386", "amd64", "armhf", "arm64", "powerpc", "ppc64el"];

/// Release codenames the curated catalog may target, plus the `all` sentinel.
pub const KNOWN_CODENAMES: &[&str] = &["all", "xenial", "zesty", "artful", "bionic", "cosmic"];

/// Archive components apt packages may come from. `ppa:` references and
/// `manual` are recognised separately.
pub const KNOWN_SOURCES: &[&str] = &[
    "main",
    "universe",
    "restricted",
    "multiverse",
    "partner",
];

pub fn is_known_arch(arch: &str) -> bool {
    KNOWN_ARCH.contains(&arch)
}

pub fn is_known_codename(codename: &str) -> bool {
    KNOWN_CODENAMES.contains(&codename)
}

pub fn is_known_component(source: &str) -> bool {
    KNOWN_SOURCES.contains(&source)
}

/// Display block stored under the catalog's reserved `distro` key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DistroInfo {
    pub name: String,
    pub info_url: String,
    pub support_url: String,
}

impl Default for DistroInfo {
    fn default() -> Self {
        Self {
            name: "Ubuntu MATE".to_string(),
            info_url: "https://ubuntu-mate.org".to_string(),
            support_url: "https://ubuntu-mate.community".to_string(),
        }
    }
}
