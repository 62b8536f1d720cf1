//! Explicit session context, constructed once at startup and passed to every
//! component that needs it. Replaces ambient process-global state.

use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionContext {
    /// dpkg-style architecture name, e.g. "amd64".
    pub os_arch: String,
    /// Release codename used to select installation directives.
    pub os_codename: String,
    /// Locale tag, e.g. "de" or "pt_BR".
    pub locale: String,
}

impl SessionContext {
    pub fn new(
        os_arch: impl Into<String>,
        os_codename: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            os_arch: os_arch.into(),
            os_codename: os_codename.into(),
            locale: locale.into(),
        }
    }

    /// Builds a context from `/etc/os-release` and the `LANG` environment
    /// variable, falling back to neutral values when either is unreadable.
    pub fn detect() -> Self {
        let contents = fs::read_to_string(Path::new("/etc/os-release")).unwrap_or_default();
        let codename = codename_from_os_release(&contents).unwrap_or_else(|| "unknown".to_string());
        let locale = std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(str::to_string))
            .filter(|tag| !tag.is_empty() && tag != "C")
            .unwrap_or_else(|| "en".to_string());

        Self::new(dpkg_arch(), codename, locale)
    }
}

/// Maps Rust's target arch names onto dpkg's.
fn dpkg_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        other => other,
    }
}

/// Prefers the codename field, falling back to the release id; both appear
/// quoted or bare in the wild.
fn codename_from_os_release(contents: &str) -> Option<String> {
    os_release_field(contents, "UBUNTU_CODENAME")
        .or_else(|| os_release_field(contents, "VERSION_CODENAME"))
}

fn os_release_field(contents: &str, field: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if key.trim() == field {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{codename_from_os_release, os_release_field};

    const OS_RELEASE_FIXTURE: &str = concat!(
        "NAME=\"Ubuntu\"\n",
        "VERSION=\"18.04.6 LTS (Bionic Beaver)\"\n",
        "ID=ubuntu\n",
        "VERSION_CODENAME=bionic\n",
        "UBUNTU_CODENAME=bionic\n",
    );

    #[test]
    fn reads_quoted_and_bare_fields() {
        assert_eq!(
            os_release_field(OS_RELEASE_FIXTURE, "NAME").as_deref(),
            Some("Ubuntu")
        );
        assert_eq!(
            os_release_field(OS_RELEASE_FIXTURE, "ID").as_deref(),
            Some("ubuntu")
        );
        assert_eq!(os_release_field(OS_RELEASE_FIXTURE, "MISSING"), None);
    }

    #[test]
    fn codename_prefers_ubuntu_codename() {
        assert_eq!(
            codename_from_os_release(OS_RELEASE_FIXTURE).as_deref(),
            Some("bionic")
        );
        assert_eq!(
            codename_from_os_release("VERSION_CODENAME=cosmic\n").as_deref(),
            Some("cosmic")
        );
        assert_eq!(codename_from_os_release("ID=other\n"), None);
    }
}
