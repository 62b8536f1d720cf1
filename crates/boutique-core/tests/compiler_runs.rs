use std::fs;
use std::path::Path;

use serde_json::{Value, json};

use boutique_core::catalog::Catalog;
use boutique_core::compiler::{CompileOptions, Severity, compile};

fn write_app(source: &Path, category: &str, app_id: &str, metadata: &Value) {
    let dir = source.join(category).join(app_id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("metadata.json"),
        serde_json::to_string_pretty(metadata).unwrap(),
    )
    .unwrap();
    fs::write(dir.join("icon.png"), b"png").unwrap();
}

fn calc_metadata() -> Value {
    json!({
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
        "launch-cmd": "calc",
        "alternate-to": null,
        "post-install": [],
        "post-remove": [],
        "installation": {
            "all": {
                "main-package": "calc",
                "install-packages": ["calc"],
                "remove-packages": ["calc"],
                "source": "universe"
            }
        }
    })
}

#[test]
fn clean_tree_compiles_to_a_loadable_index() {
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("apps");
    let output = workdir.path().join("dist");

    write_app(&source, "accessories", "calc", &calc_metadata());
    fs::write(
        source.join("accessories/calc/screenshot-1.jpg"),
        b"jpg",
    )
    .unwrap();

    let report = compile(&CompileOptions::new(&source, &output)).unwrap();
    assert!(!report.failed(), "{:?}", report.diagnostics);

    let stats = report.stats.unwrap();
    assert_eq!(stats.categories, 1);
    assert_eq!(stats.apps, 1);
    assert!(stats.compiled > 0);

    assert!(output.join("icons/calc.png").exists());
    assert!(output.join("screenshots/calc-1.jpg").exists());

    let catalog = Catalog::load(&output.join("index/en.json")).unwrap();
    assert_eq!(catalog.app_count(), 1);
    assert_eq!(catalog.stats.unwrap().apps, 1);
    assert_eq!(catalog.distro.as_ref().unwrap().name, "Ubuntu MATE");
    assert!(catalog.get("accessories", "calc").is_some());
}

#[test]
fn one_faulty_entry_fails_the_whole_run() {
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("apps");
    let output = workdir.path().join("dist");

    write_app(&source, "accessories", "calc", &calc_metadata());
    let mut broken = calc_metadata();
    broken.as_object_mut().unwrap().remove("name");
    write_app(&source, "accessories", "broken", &broken);

    let report = compile(&CompileOptions::new(&source, &output)).unwrap();
    assert!(report.failed());
    assert_eq!(report.faulted_entries, 1);
    assert!(report.diagnostics.iter().any(|d| {
        d.severity == Severity::Error && d.entry.as_deref() == Some("accessories/broken")
    }));
    // Nothing ships from a failed run.
    assert!(!output.join("index/en.json").exists());
}

#[test]
fn manual_source_needs_its_list_asset() {
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("apps");
    let output = workdir.path().join("dist");

    let mut metadata = calc_metadata();
    metadata["installation"]["all"]["source"] = json!("manual");
    metadata["installation"]["all"]["list-file"] = json!("example.list");
    metadata["installation"]["all"]["list-key-url"] = json!("https://example.com/key.asc");
    write_app(&source, "accessories", "calc", &metadata);

    let report = compile(&CompileOptions::new(&source, &output)).unwrap();
    assert!(report.failed(), "missing list file must be a fault");

    // With the asset present the same tree compiles and the list ships.
    fs::write(source.join("accessories/calc/example.list"), b"deb ...").unwrap();
    let report = compile(&CompileOptions::new(&source, &output)).unwrap();
    assert!(!report.failed(), "{:?}", report.diagnostics);
    assert!(output.join("source-lists/example.list").exists());
}

#[test]
fn unknown_architecture_warns_but_ships() {
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("apps");
    let output = workdir.path().join("dist");

    let mut metadata = calc_metadata();
    metadata["arch"] = json!(["amd64", "riscv64"]);
    write_app(&source, "accessories", "calc", &metadata);

    let report = compile(&CompileOptions::new(&source, &output)).unwrap();
    assert!(!report.failed(), "{:?}", report.diagnostics);
    assert!(report.diagnostics.iter().any(|d| {
        d.severity == Severity::Warning && d.message.contains("riscv64")
    }));
    assert!(output.join("index/en.json").exists());
}

#[test]
fn unlisted_entries_are_skipped_without_failing() {
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("apps");
    let output = workdir.path().join("dist");

    write_app(&source, "accessories", "calc", &calc_metadata());
    let mut retired = calc_metadata();
    retired["listed"] = json!(false);
    write_app(&source, "accessories", "retired", &retired);

    let report = compile(&CompileOptions::new(&source, &output)).unwrap();
    assert!(!report.failed(), "{:?}", report.diagnostics);

    let catalog = Catalog::load(&output.join("index/en.json")).unwrap();
    assert!(catalog.get("accessories", "calc").is_some());
    assert!(catalog.get("accessories", "retired").is_none());
}

#[test]
fn locale_variants_carry_the_translations() {
    let workdir = tempfile::tempdir().unwrap();
    let source = workdir.path().join("apps");
    let output = workdir.path().join("dist");
    let translations = workdir.path().join("translations");

    write_app(&source, "accessories", "calc", &calc_metadata());
    fs::create_dir_all(translations.join("calc")).unwrap();
    fs::write(
        translations.join("calc/fr.json"),
        r#"{ "name": "Calculatrice" }"#,
    )
    .unwrap();

    let mut options = CompileOptions::new(&source, &output);
    options.translations_dir = Some(translations);
    options.locales = vec!["fr".to_string(), "de".to_string()];

    let report = compile(&options).unwrap();
    assert!(!report.failed(), "{:?}", report.diagnostics);

    let french: Value = serde_json::from_str(
        &fs::read_to_string(output.join("index/fr.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(french["accessories"]["calc"]["name"], "Calculatrice");
    // Untranslated fields keep the authored text.
    assert_eq!(french["accessories"]["calc"]["summary"], "A calculator");

    // Locales without translations still get a complete index.
    let german: Value = serde_json::from_str(
        &fs::read_to_string(output.join("index/de.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(german["accessories"]["calc"]["name"], "Calc");
}
