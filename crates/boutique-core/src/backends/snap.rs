//! Sandboxed-package backend. Maps a catalog entry to a snap name and
//! delegates to the store's transactional API. Snaps self-update, so
//! `upgrade` is a successful no-op.

use crate::backends::backend::{BackendId, CancelToken, InstallBackend};
use crate::models::{AppRecord, EngineResult, Progress, ProgressSink};

/// The snap store's transactional API, an external collaborator.
pub trait SnapStore: Send + Sync {
    fn is_installed(&self, snap: &str) -> EngineResult<bool>;

    fn install(&self, snap: &str, cancel: &CancelToken) -> EngineResult<()>;

    fn remove(&self, snap: &str, cancel: &CancelToken) -> EngineResult<()>;
}

pub struct SnapBackend<S: SnapStore> {
    store: S,
}

impl<S: SnapStore> SnapBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

/// The directive's `main_package` names the snap; entries without one fall
/// back to the app id, which matches the store name for most snaps.
fn snap_name(app: &AppRecord) -> String {
    app.installation
        .get("all")
        .or_else(|| app.installation.values().next())
        .map(|directive| directive.main_package.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| app.id.clone())
}

impl<S: SnapStore> InstallBackend for SnapBackend<S> {
    fn id(&self) -> BackendId {
        BackendId::Snap
    }

    fn is_installed(&self, app: &AppRecord) -> EngineResult<bool> {
        self.store.is_installed(&snap_name(app))
    }

    fn install(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        cancel.ensure_live(app)?;
        let snap = snap_name(app);
        sink.emit(Progress {
            current: 1,
            total: 1,
            text: format!("Installing {} from the snap store", app.name),
        });
        self.store.install(&snap, cancel)
    }

    fn remove(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        cancel.ensure_live(app)?;
        let snap = snap_name(app);
        sink.emit(Progress {
            current: 1,
            total: 1,
            text: format!("Removing {}", app.name),
        });
        self.store.remove(&snap, cancel)
    }

    fn upgrade(
        &self,
        app: &AppRecord,
        _sink: &dyn ProgressSink,
        _cancel: &CancelToken,
    ) -> EngineResult<()> {
        tracing::debug!(app = %app.uuid(), "snaps self-update, upgrade is a no-op");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{SnapBackend, SnapStore};
    use crate::backends::backend::{CancelToken, InstallBackend};
    use crate::models::app::testing::{directive, sample_app};
    use crate::models::progress::testing::RecordingSink;
    use crate::models::{EngineResult, InstallMethod};

    #[derive(Default)]
    struct ScriptedStore {
        installed: bool,
        calls: Mutex<Vec<String>>,
    }

    impl SnapStore for ScriptedStore {
        fn is_installed(&self, snap: &str) -> EngineResult<bool> {
            self.calls.lock().unwrap().push(format!("query:{snap}"));
            Ok(self.installed)
        }

        fn install(&self, snap: &str, _cancel: &CancelToken) -> EngineResult<()> {
            self.calls.lock().unwrap().push(format!("install:{snap}"));
            Ok(())
        }

        fn remove(&self, snap: &str, _cancel: &CancelToken) -> EngineResult<()> {
            self.calls.lock().unwrap().push(format!("remove:{snap}"));
            Ok(())
        }
    }

    #[test]
    fn directive_main_package_names_the_snap() {
        let app = sample_app(
            "accessories",
            "calc",
            InstallMethod::Snap,
            &[("all", directive("calc-snap", &[]))],
        );
        let backend = SnapBackend::new(ScriptedStore::default());
        backend
            .install(&app, &RecordingSink::default(), &CancelToken::new())
            .unwrap();
        assert_eq!(
            backend.store.calls.lock().unwrap().clone(),
            ["install:calc-snap"]
        );
    }

    #[test]
    fn missing_directive_falls_back_to_app_id() {
        let app = sample_app("accessories", "calc", InstallMethod::Snap, &[]);
        let backend = SnapBackend::new(ScriptedStore::default());
        assert!(!backend.is_installed(&app).unwrap());
        assert_eq!(backend.store.calls.lock().unwrap().clone(), ["query:calc"]);
    }

    #[test]
    fn upgrade_is_a_no_op_success() {
        let app = sample_app("accessories", "calc", InstallMethod::Snap, &[]);
        let backend = SnapBackend::new(ScriptedStore::default());
        let sink = RecordingSink::default();
        backend.upgrade(&app, &sink, &CancelToken::new()).unwrap();
        assert!(backend.store.calls.lock().unwrap().is_empty());
        assert!(sink.seen.lock().unwrap().is_empty());
    }
}
