//! Per-entry validation of raw app metadata. Pure: works on the parsed
//! JSON plus the set of asset filenames present in the app's source folder.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::compiler::{Diagnostic, Severity};
use crate::distro;

/// Outcome of validating one app's metadata.
#[derive(Debug, Default)]
pub struct EntryOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Any fault excludes the entry from the compiled catalog and fails the
    /// compilation run as a whole.
    pub faulted: bool,
    /// Explicitly unlisted; skipped without fault.
    pub skipped: bool,
}

impl EntryOutcome {
    fn fault(&mut self, entry: &str, message: impl Into<String>) {
        self.faulted = true;
        self.diagnostics
            .push(Diagnostic::new(Severity::Error, entry, message));
    }

    fn warn(&mut self, entry: &str, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(Severity::Warning, entry, message));
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FieldType {
    Str,
    Bool,
    List,
    Dict,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Dict => value.is_object(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Bool => "boolean",
            Self::List => "list",
            Self::Dict => "object",
        }
    }
}

const REQUIRED_FIELDS: &[(&str, FieldType)] = &[
    ("listed", FieldType::Bool),
    ("name", FieldType::Str),
    ("summary", FieldType::Str),
    ("description", FieldType::Str),
    ("developer-name", FieldType::Str),
    ("developer-url", FieldType::Str),
    ("tags", FieldType::List),
    ("proprietary", FieldType::Bool),
    ("arch", FieldType::List),
    ("releases", FieldType::List),
    ("method", FieldType::Str),
    ("installation", FieldType::Dict),
];

const OPTIONAL_FIELDS: &[(&str, FieldType)] = &[
    ("launch-cmd", FieldType::Str),
    ("alternate-to", FieldType::Str),
    ("post-install", FieldType::List),
    ("post-remove", FieldType::List),
];

const KNOWN_METHODS: &[&str] = &["none", "dummy", "apt", "snap"];

/// Validates one entry. `assets` holds the filenames shipped alongside the
/// metadata (icon, screenshots, source lists).
pub fn validate_entry(
    category: &str,
    app_id: &str,
    metadata: &Value,
    assets: &BTreeSet<String>,
) -> EntryOutcome {
    let entry = format!("{category}/{app_id}");
    let mut outcome = EntryOutcome::default();

    if app_id.chars().any(char::is_whitespace) {
        outcome.fault(&entry, "whitespace is not allowed in app IDs");
        return outcome;
    }

    let Some(fields) = metadata.as_object() else {
        outcome.fault(&entry, "metadata root is not an object");
        return outcome;
    };

    if fields.get("listed") == Some(&Value::Bool(false)) {
        outcome.skipped = true;
        outcome.diagnostics.push(Diagnostic::new(
            Severity::Warning,
            &entry,
            "marked as unlisted, skipping",
        ));
        return outcome;
    }

    for (key, field_type) in REQUIRED_FIELDS {
        match fields.get(*key) {
            None => outcome.fault(&entry, format!("missing required key '{key}'")),
            Some(value) if !field_type.matches(value) => outcome.fault(
                &entry,
                format!("wrong type for key '{key}' (should be {})", field_type.name()),
            ),
            Some(value) => {
                // Present but vacuous: data exists, there is just nothing in it.
                let empty = match field_type {
                    FieldType::Str => value.as_str().is_some_and(str::is_empty),
                    FieldType::List => value.as_array().is_some_and(Vec::is_empty),
                    _ => false,
                };
                if empty {
                    outcome.warn(&entry, format!("no data for required key '{key}'"));
                }
            }
        }
    }

    for (key, field_type) in OPTIONAL_FIELDS {
        match fields.get(*key) {
            None => outcome.warn(
                &entry,
                format!("optional key missing, consider adding it with null: '{key}'"),
            ),
            Some(Value::Null) => {}
            Some(value) if !field_type.matches(value) => outcome.fault(
                &entry,
                format!("wrong type for key '{key}' (should be {})", field_type.name()),
            ),
            Some(_) => {}
        }
    }

    let method = fields.get("method").and_then(Value::as_str);
    match method {
        Some(method) if KNOWN_METHODS.contains(&method) => {
            if method == "apt" {
                validate_apt_installation(&entry, fields, assets, &mut outcome);
            }
        }
        Some(other) => {
            outcome.fault(&entry, format!("unrecognized method '{other}'"));
        }
        // Already faulted above as a missing/mistyped required key.
        None => {}
    }

    if let Some(arches) = fields.get("arch").and_then(Value::as_array) {
        for arch in arches.iter().filter_map(Value::as_str) {
            if !distro::is_known_arch(arch) {
                outcome.warn(&entry, format!("unrecognized architecture '{arch}'"));
            }
        }
    }

    outcome
}

fn validate_apt_installation(
    entry: &str,
    fields: &serde_json::Map<String, Value>,
    assets: &BTreeSet<String>,
    outcome: &mut EntryOutcome,
) {
    let Some(installation) = fields.get("installation").and_then(Value::as_object) else {
        return;
    };

    for (raw_codename, block) in installation {
        for token in raw_codename.split(',').map(str::trim) {
            if !distro::is_known_codename(token) {
                outcome.warn(entry, format!("unrecognized codename '{token}'"));
            }
        }

        let Some(block) = block.as_object() else {
            outcome.fault(entry, format!("installation block '{raw_codename}' is not an object"));
            continue;
        };

        let main_ok = block.get("main-package").is_some_and(Value::is_string);
        let install_ok = block.get("install-packages").is_some_and(Value::is_array);
        let remove_ok = block.get("remove-packages").is_some_and(Value::is_array);
        if !(main_ok && install_ok && remove_ok) {
            outcome.fault(
                entry,
                format!(
                    "installation block '{raw_codename}' must carry main-package, \
                     install-packages and remove-packages with correct types"
                ),
            );
            continue;
        }

        let Some(source) = block.get("source").and_then(Value::as_str) else {
            outcome.fault(
                entry,
                format!("installation block '{raw_codename}' has no source"),
            );
            continue;
        };

        if source == "manual" {
            validate_manual_source(entry, raw_codename, block, assets, outcome);
        } else if !source.starts_with("ppa:") && !distro::is_known_component(source) {
            outcome.fault(
                entry,
                format!("unrecognized source '{source}', installation would fail"),
            );
        }
    }
}

fn validate_manual_source(
    entry: &str,
    raw_codename: &str,
    block: &serde_json::Map<String, Value>,
    assets: &BTreeSet<String>,
    outcome: &mut EntryOutcome,
) {
    match block.get("list-file").and_then(Value::as_str) {
        None => {
            outcome.fault(
                entry,
                format!("manual source in '{raw_codename}' without a list file"),
            );
            return;
        }
        Some(list_file) if !assets.contains(list_file) => {
            outcome.fault(
                entry,
                format!("manual source list file '{list_file}' is missing"),
            );
            return;
        }
        Some(_) => {}
    }

    let has_key = block.get("list-key-url").is_some_and(Value::is_string)
        || block.get("list-key-server").is_some_and(Value::is_string);
    if !has_key {
        outcome.fault(
            entry,
            format!("manual source in '{raw_codename}' without a key URL or key server"),
        );
    }
}
