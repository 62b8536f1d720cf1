//! Testing double: reports nothing installed, simulates latency, always
//! succeeds. Selected for `method = none` entries and usable as a forced
//! diagnostic backend.

use std::thread;
use std::time::Duration;

use crate::backends::backend::{BackendId, CancelToken, InstallBackend};
use crate::models::{AppRecord, EngineResult, Progress, ProgressSink};

const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(120);
const FALLBACK_STEPS: u64 = 3;

pub struct InertBackend {
    step_delay: Duration,
}

impl Default for InertBackend {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}

impl InertBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_delay(step_delay: Duration) -> Self {
        Self { step_delay }
    }

    fn simulate(
        &self,
        app: &AppRecord,
        verb: &str,
        packages: &[String],
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let steps = if packages.is_empty() {
            FALLBACK_STEPS
        } else {
            packages.len() as u64
        };

        for step in 1..=steps {
            cancel.ensure_live(app)?;
            let subject = packages
                .get(step as usize - 1)
                .map(String::as_str)
                .unwrap_or(app.name.as_str());
            sink.emit(Progress {
                current: step,
                total: steps,
                text: format!("{verb} {subject}"),
            });
            thread::sleep(self.step_delay);
        }

        cancel.ensure_live(app)
    }
}

impl InstallBackend for InertBackend {
    fn id(&self) -> BackendId {
        BackendId::Inert
    }

    fn is_installed(&self, _app: &AppRecord) -> EngineResult<bool> {
        Ok(false)
    }

    fn install(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let packages = directive_packages(app, true);
        self.simulate(app, "Installing", &packages, sink, cancel)
    }

    fn remove(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let packages = directive_packages(app, false);
        self.simulate(app, "Removing", &packages, sink, cancel)
    }

    fn upgrade(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let packages = directive_packages(app, true);
        self.simulate(app, "Upgrading", &packages, sink, cancel)
    }
}

fn directive_packages(app: &AppRecord, install: bool) -> Vec<String> {
    app.installation
        .get("all")
        .map(|directive| {
            if install {
                directive.install_packages.clone()
            } else {
                directive.remove_packages.clone()
            }
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use super::InertBackend;
    use crate::backends::backend::{CancelToken, InstallBackend};
    use crate::models::progress::testing::RecordingSink;
    use crate::models::{AppRecord, EngineErrorKind, InstallDirective, InstallMethod};

    fn app() -> AppRecord {
        let mut installation = BTreeMap::new();
        installation.insert(
            "all".to_string(),
            InstallDirective {
                main_package: "calc".to_string(),
                install_packages: vec!["calc".to_string(), "calc-data".to_string()],
                remove_packages: vec!["calc".to_string()],
                ..InstallDirective::default()
            },
        );
        AppRecord {
            category: "accessories".to_string(),
            id: "calc".to_string(),
            listed: true,
            name: "Calc".to_string(),
            summary: String::new(),
            description: String::new(),
            tags: Default::default(),
            developer_name: "Example".to_string(),
            developer_url: "https://example.com".to_string(),
            proprietary: false,
            alternate_to: None,
            launch_cmd: None,
            arch: Default::default(),
            releases: Default::default(),
            method: InstallMethod::None,
            installation,
            post_install: Vec::new(),
            post_remove: Vec::new(),
        }
    }

    #[test]
    fn never_reports_installed_and_always_succeeds() {
        let backend = InertBackend::with_step_delay(Duration::ZERO);
        let app = app();
        let sink = RecordingSink::default();
        let cancel = CancelToken::new();

        assert!(!backend.is_installed(&app).unwrap());
        backend.install(&app, &sink, &cancel).unwrap();

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].current, 1);
        assert_eq!(seen[0].total, 2);
        assert_eq!(seen[1].text, "Installing calc-data");
    }

    #[test]
    fn cancellation_is_acknowledged_between_steps() {
        let backend = InertBackend::with_step_delay(Duration::ZERO);
        let app = app();
        let sink = RecordingSink::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let error = backend.install(&app, &sink, &cancel).unwrap_err();
        assert_eq!(error.kind, EngineErrorKind::Cancelled);
        assert!(sink.seen.lock().unwrap().is_empty());
    }
}
