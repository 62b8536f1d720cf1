//! Locale overlays for the compiled index. Each translated variant starts
//! from the finished index and substitutes the display strings an app has
//! translations for; untranslated apps keep their original text.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::catalog::{DISTRO_KEY, STATS_KEY};
use crate::compiler::{Diagnostic, Severity};

/// Display fields eligible for translation. Everything else in an entry is
/// machine-facing and stays as authored.
const TRANSLATABLE_FIELDS: [&str; 4] = ["name", "summary", "description", "developer-name"];

/// Produces the translated copy of `index` for one locale. Missing
/// translation files fall back silently; malformed ones are reported and
/// skipped so a bad translation can never break the catalog.
pub fn localise_index(
    index: &Map<String, Value>,
    locale: &str,
    translations_dir: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) -> Map<String, Value> {
    let mut localised = index.clone();

    for (category, apps) in &mut localised {
        if category == STATS_KEY || category == DISTRO_KEY {
            continue;
        }
        let Some(apps) = apps.as_object_mut() else {
            continue;
        };

        for (app_id, entry) in apps {
            let Some(fields) = entry.as_object_mut() else {
                continue;
            };
            match load_translation(translations_dir, app_id, locale) {
                Ok(Some(translation)) => overlay(fields, &translation),
                Ok(None) => {}
                Err(message) => diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    &format!("{category}/{app_id}"),
                    format!("unusable {locale} translation: {message}"),
                )),
            }
        }
    }

    localised
}

fn load_translation(
    translations_dir: &Path,
    app_id: &str,
    locale: &str,
) -> Result<Option<Map<String, Value>>, String> {
    let path = translations_dir.join(app_id).join(format!("{locale}.json"));
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path).map_err(|error| error.to_string())?;
    let value: Value = serde_json::from_str(&raw).map_err(|error| error.to_string())?;
    match value {
        Value::Object(translation) => Ok(Some(translation)),
        _ => Err("root is not an object".to_string()),
    }
}

/// Copies the translated strings over the authored ones. Empty translations
/// are treated as absent; partial files translate what they can.
fn overlay(fields: &mut Map<String, Value>, translation: &Map<String, Value>) {
    for key in TRANSLATABLE_FIELDS {
        if let Some(Value::String(text)) = translation.get(key) {
            if !text.trim().is_empty() {
                fields.insert(key.to_string(), Value::String(text.clone()));
            }
        }
    }
}
