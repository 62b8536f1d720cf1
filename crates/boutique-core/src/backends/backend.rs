use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::{
    AppRecord, EngineError, EngineErrorKind, EngineResult, InstallMethod, ProgressSink,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BackendId {
    Inert,
    Apt,
    Snap,
}

impl BackendId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inert => "inert",
            Self::Apt => "apt",
            Self::Snap => "snap",
        }
    }

    /// Maps a catalog entry's method onto the one backend that may act on
    /// it. An unrecognized method is a fatal entry error, never a default.
    pub fn for_method(method: &InstallMethod) -> Result<Self, String> {
        match method {
            InstallMethod::None => Ok(Self::Inert),
            InstallMethod::Apt => Ok(Self::Apt),
            InstallMethod::Snap => Ok(Self::Snap),
            InstallMethod::Unknown(raw) => Err(raw.clone()),
        }
    }
}

/// Cooperative cancellation flag shared between the orchestrator and the
/// backend operation it is running.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Errors with `Cancelled` once the flag is raised, attributing the
    /// abort to the given app.
    pub fn ensure_live(&self, app: &AppRecord) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::for_app(
                app.uuid(),
                EngineErrorKind::Cancelled,
                "operation cancelled",
            ))
        } else {
            Ok(())
        }
    }
}

/// The uniform capability contract every installation mechanism satisfies.
/// Operations are blocking; the orchestrator runs them on a worker thread.
/// A terminal `Ok` means the whole transaction committed; there is no
/// partial-success state.
pub trait InstallBackend: Send + Sync {
    fn id(&self) -> BackendId;

    fn is_installed(&self, app: &AppRecord) -> EngineResult<bool>;

    fn install(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()>;

    fn remove(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()>;

    fn upgrade(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()>;
}

/// Closed registry mapping each backend id to its one live instance.
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: HashMap<BackendId, Arc<dyn InstallBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Arc<dyn InstallBackend>) -> EngineResult<()> {
        let id = backend.id();
        if self.backends.insert(id, backend).is_some() {
            return Err(EngineError::new(
                EngineErrorKind::Internal,
                format!("duplicate backend registration for '{}'", id.as_str()),
            ));
        }
        Ok(())
    }

    pub fn has(&self, id: BackendId) -> bool {
        self.backends.contains_key(&id)
    }

    /// Resolves an app record to exactly one backend. Unknown methods and
    /// unregistered backends both exclude the entry from being queued.
    pub fn resolve(&self, app: &AppRecord) -> EngineResult<Arc<dyn InstallBackend>> {
        let id = BackendId::for_method(&app.method).map_err(|raw| {
            EngineError::for_app(
                app.uuid(),
                EngineErrorKind::UnsupportedMethod,
                format!("unrecognized installation method '{raw}'"),
            )
        })?;

        self.backends.get(&id).cloned().ok_or_else(|| {
            EngineError::for_app(
                app.uuid(),
                EngineErrorKind::UnsupportedMethod,
                format!("no backend registered for method '{}'", id.as_str()),
            )
        })
    }
}
