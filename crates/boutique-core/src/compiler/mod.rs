//! Offline catalog compiler: validates per-app source folders and assembles
//! the compiled index plus its copied assets. Validation is per-entry, but
//! shipping is all-or-nothing: one faulty entry fails the whole run.

pub mod locale;
pub mod validate;

pub use validate::{EntryOutcome, validate_entry};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::catalog::{CatalogStats, DISTRO_KEY, STATS_KEY};
use crate::distro::DistroInfo;
use crate::models::{EngineError, EngineErrorKind, EngineResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
    Error,
    Success,
    Warning,
    Info,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `category/app_id` when the diagnostic concerns one entry.
    pub entry: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, entry: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            entry: Some(entry.to_string()),
            message: message.into(),
        }
    }

    pub fn run(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            entry: None,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Tree of per-app source folders: `<source>/<category>/<app_id>/`.
    pub source_dir: PathBuf,
    /// Compiled output root; `icons/`, `screenshots/`, `source-lists/` and
    /// `index/` are (re)created underneath.
    pub output_dir: PathBuf,
    /// Per-app translation sources: `<dir>/<app_id>/<locale>.json`.
    pub translations_dir: Option<PathBuf>,
    /// Locales to produce translated catalog variants for.
    pub locales: Vec<String>,
    pub distro: DistroInfo,
}

impl CompileOptions {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            translations_dir: None,
            locales: Vec::new(),
            distro: DistroInfo::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CompileReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Number of entries excluded by at least one fault.
    pub faulted_entries: usize,
    pub stats: Option<CatalogStats>,
}

impl CompileReport {
    pub fn failed(&self) -> bool {
        self.faulted_entries > 0
    }
}

/// Runs the whole compilation pass. `Err` is reserved for environmental
/// problems (unreadable source tree, unwritable output); validation faults
/// are reported through the returned `CompileReport` instead.
pub fn compile(options: &CompileOptions) -> EngineResult<CompileReport> {
    let mut report = CompileReport::default();
    report
        .diagnostics
        .push(Diagnostic::run(Severity::Info, "Compiling index..."));

    reset_output_tree(&options.output_dir)?;

    let mut index: Map<String, Value> = Map::new();
    for category in sorted_subdirs(&options.source_dir)? {
        let mut apps = Map::new();
        let category_dir = options.source_dir.join(&category);

        for app_id in sorted_subdirs(&category_dir)? {
            let app_dir = category_dir.join(&app_id);
            if let Some(metadata) = load_entry(&category, &app_id, &app_dir, &mut report)? {
                copy_entry_assets(&category, &app_id, &app_dir, options, &metadata, &mut report)?;
                report.diagnostics.push(Diagnostic::new(
                    Severity::Success,
                    &format!("{category}/{app_id}"),
                    "OK",
                ));
                apps.insert(app_id, metadata);
            }
        }

        if !apps.is_empty() {
            index.insert(category, Value::Object(apps));
        }
    }

    let stats = CatalogStats {
        categories: index.len() as u64,
        apps: index
            .values()
            .filter_map(Value::as_object)
            .map(|apps| apps.len() as u64)
            .sum(),
        compiled: unix_timestamp(),
    };
    report.stats = Some(stats);

    if report.failed() {
        report.diagnostics.push(Diagnostic::run(
            Severity::Error,
            "Index validation failed! Fix or unlist the faulty software.",
        ));
        return Ok(report);
    }

    index.insert(STATS_KEY.to_string(), serde_json::to_value(stats).map_err(internal)?);
    index.insert(
        DISTRO_KEY.to_string(),
        serde_json::to_value(&options.distro).map_err(internal)?,
    );

    let index_dir = options.output_dir.join("index");
    write_index(&index_dir.join("en.json"), &index)?;

    for locale_name in &options.locales {
        let localised = match &options.translations_dir {
            Some(translations_dir) => locale::localise_index(
                &index,
                locale_name,
                translations_dir,
                &mut report.diagnostics,
            ),
            None => index.clone(),
        };
        write_index(&index_dir.join(format!("{locale_name}.json")), &localised)?;
    }

    report
        .diagnostics
        .push(Diagnostic::run(Severity::Success, "Index ready to go."));
    Ok(report)
}

/// Reads, parses and validates one entry. `None` means the entry was
/// skipped or excluded; the report carries the reasons.
fn load_entry(
    category: &str,
    app_id: &str,
    app_dir: &Path,
    report: &mut CompileReport,
) -> EngineResult<Option<Value>> {
    let entry = format!("{category}/{app_id}");
    let metadata_path = app_dir.join("metadata.json");

    if !metadata_path.exists() {
        report.faulted_entries += 1;
        report.diagnostics.push(Diagnostic::new(
            Severity::Error,
            &entry,
            "missing metadata.json",
        ));
        return Ok(None);
    }

    let raw = fs::read_to_string(&metadata_path)
        .map_err(|error| environmental(&metadata_path, error))?;
    let metadata: Value = match serde_json::from_str(&raw) {
        Ok(metadata) => metadata,
        Err(error) => {
            report.faulted_entries += 1;
            report.diagnostics.push(Diagnostic::new(
                Severity::Error,
                &entry,
                format!("corrupt metadata.json: {error}"),
            ));
            return Ok(None);
        }
    };

    let assets = asset_names(app_dir)?;
    let outcome = validate_entry(category, app_id, &metadata, &assets);
    report.diagnostics.extend(outcome.diagnostics);

    if outcome.faulted {
        report.faulted_entries += 1;
        return Ok(None);
    }
    if outcome.skipped {
        return Ok(None);
    }
    Ok(Some(metadata))
}

/// Copies the admitted entry's static assets under normalized names.
fn copy_entry_assets(
    category: &str,
    app_id: &str,
    app_dir: &Path,
    options: &CompileOptions,
    metadata: &Value,
    report: &mut CompileReport,
) -> EngineResult<()> {
    let entry = format!("{category}/{app_id}");

    let icon = app_dir.join("icon.png");
    if icon.exists() {
        let target = options.output_dir.join("icons").join(format!("{app_id}.png"));
        fs::copy(&icon, &target).map_err(|error| environmental(&target, error))?;
    } else {
        report.diagnostics.push(Diagnostic::new(
            Severity::Warning,
            &entry,
            "no icon.png, a generic icon will be shown",
        ));
    }

    for name in asset_names(app_dir)? {
        if let Some(number) = screenshot_number(&name) {
            let target = options
                .output_dir
                .join("screenshots")
                .join(format!("{app_id}-{number}.jpg"));
            fs::copy(app_dir.join(&name), &target)
                .map_err(|error| environmental(&target, error))?;
        }
    }

    // Manual-source list files ship with the catalog so the backend can
    // enable them at install time.
    for block in metadata
        .get("installation")
        .and_then(Value::as_object)
        .map(|blocks| blocks.values())
        .into_iter()
        .flatten()
    {
        if let Some(list_file) = block.get("list-file").and_then(Value::as_str) {
            let source = app_dir.join(list_file);
            if source.exists() {
                let target = options.output_dir.join("source-lists").join(list_file);
                fs::copy(&source, &target).map_err(|error| environmental(&target, error))?;
            }
        }
    }

    Ok(())
}

fn reset_output_tree(output_dir: &Path) -> EngineResult<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|error| environmental(output_dir, error))?;
    }
    for subdir in ["icons", "screenshots", "source-lists", "index"] {
        let path = output_dir.join(subdir);
        fs::create_dir_all(&path).map_err(|error| environmental(&path, error))?;
    }
    Ok(())
}

fn write_index(path: &Path, index: &Map<String, Value>) -> EngineResult<()> {
    let document =
        serde_json::to_string_pretty(&Value::Object(index.clone())).map_err(internal)?;
    fs::write(path, document).map_err(|error| environmental(path, error))
}

fn sorted_subdirs(dir: &Path) -> EngineResult<Vec<String>> {
    let mut names = Vec::new();
    let entries = fs::read_dir(dir).map_err(|error| environmental(dir, error))?;
    for dir_entry in entries {
        let dir_entry = dir_entry.map_err(|error| environmental(dir, error))?;
        if dir_entry.path().is_dir() {
            names.push(dir_entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn asset_names(app_dir: &Path) -> EngineResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let entries = fs::read_dir(app_dir).map_err(|error| environmental(app_dir, error))?;
    for dir_entry in entries {
        let dir_entry = dir_entry.map_err(|error| environmental(app_dir, error))?;
        if dir_entry.path().is_file() {
            names.insert(dir_entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// "screenshot-2.jpg" -> 2. Anything that does not follow the
/// `screenshot-<n>` pattern is not treated as a screenshot.
fn screenshot_number(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("screenshot-")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn environmental(path: &Path, error: std::io::Error) -> EngineError {
    EngineError::new(
        EngineErrorKind::Internal,
        format!("{}: {error}", path.display()),
    )
}

fn internal(error: serde_json::Error) -> EngineError {
    EngineError::new(EngineErrorKind::Internal, error.to_string())
}
