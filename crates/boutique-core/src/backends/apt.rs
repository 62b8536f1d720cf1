//! Debian-style backend. Resolves the codename-specific directive, keeps the
//! package cache fresh, enables non-component sources, and hands ordered
//! package lists to an `AptTransactor` as single transactions.

use std::time::Duration;

use crate::backends::backend::{BackendId, CancelToken, InstallBackend};
use crate::models::{
    AppRecord, EngineError, EngineErrorKind, EngineResult, InstallDirective, PackageSource,
    Progress, ProgressSink,
};

/// Refresh the cache when it is older than this, or was never refreshed.
const MAX_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Attached source-list plus signing key for `source = manual` directives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManualSource {
    pub list_file: String,
    pub key_url: Option<String>,
    pub key_server: Option<String>,
}

/// The underlying package-transaction capability. Implementations own the
/// actual system interaction; a commit either fully applies or errors.
pub trait AptTransactor: Send + Sync {
    /// Age of the package cache, `None` when it was never refreshed.
    fn cache_age(&self) -> Option<Duration>;

    fn refresh_cache(&self) -> EngineResult<()>;

    fn enable_component(&self, component: &str) -> EngineResult<()>;

    fn enable_ppa(&self, reference: &str) -> EngineResult<()>;

    fn enable_manual_source(&self, source: &ManualSource) -> EngineResult<()>;

    fn is_installed(&self, package: &str) -> EngineResult<bool>;

    fn commit_install(&self, packages: &[String], cancel: &CancelToken) -> EngineResult<()>;

    fn commit_remove(&self, packages: &[String], cancel: &CancelToken) -> EngineResult<()>;

    fn commit_upgrade(&self, packages: &[String], cancel: &CancelToken) -> EngineResult<()>;
}

pub struct AptBackend<T: AptTransactor> {
    transactor: T,
    codename: String,
    max_cache_age: Duration,
}

impl<T: AptTransactor> AptBackend<T> {
    pub fn new(transactor: T, codename: impl Into<String>) -> Self {
        Self {
            transactor,
            codename: codename.into(),
            max_cache_age: MAX_CACHE_AGE,
        }
    }

    pub fn with_max_cache_age(mut self, max_cache_age: Duration) -> Self {
        self.max_cache_age = max_cache_age;
        self
    }

    fn directive<'a>(&self, app: &'a AppRecord) -> EngineResult<&'a InstallDirective> {
        app.resolve_directive(&self.codename).ok_or_else(|| {
            EngineError::for_app(
                app.uuid(),
                EngineErrorKind::TransactionFailed,
                format!("no installation directive for codename '{}'", self.codename),
            )
        })
    }

    /// Refreshes the cache when stale. Age-driven, so calling it repeatedly
    /// is safe and does nothing until the cache ages out again.
    fn ensure_fresh_cache(&self, app: &AppRecord, sink: &dyn ProgressSink) -> EngineResult<()> {
        let stale = self
            .transactor
            .cache_age()
            .map_or(true, |age| age > self.max_cache_age);
        if !stale {
            return Ok(());
        }

        tracing::info!(app = %app.uuid(), "package cache stale, refreshing");
        sink.emit(Progress {
            current: 0,
            total: 0,
            text: "Refreshing package cache".to_string(),
        });
        self.transactor.refresh_cache()
    }

    fn enable_source(&self, app: &AppRecord, directive: &InstallDirective) -> EngineResult<()> {
        match directive.package_source() {
            None => Ok(()),
            Some(PackageSource::Component(component)) => {
                self.transactor.enable_component(&component)
            }
            Some(PackageSource::Ppa(reference)) => self.transactor.enable_ppa(&reference),
            Some(PackageSource::Manual) => {
                let list_file = directive.list_file.clone().ok_or_else(|| {
                    EngineError::for_app(
                        app.uuid(),
                        EngineErrorKind::TransactionFailed,
                        "manual source without an attached source list",
                    )
                })?;
                self.transactor.enable_manual_source(&ManualSource {
                    list_file,
                    key_url: directive.list_key_url.clone(),
                    key_server: directive.list_key_server.clone(),
                })
            }
        }
    }

    fn transact(
        &self,
        app: &AppRecord,
        verb: &str,
        packages: &[String],
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
        commit: impl FnOnce(&[String], &CancelToken) -> EngineResult<()>,
    ) -> EngineResult<()> {
        if packages.is_empty() {
            return Err(EngineError::for_app(
                app.uuid(),
                EngineErrorKind::TransactionFailed,
                format!("directive has no packages to {}", verb.to_lowercase()),
            ));
        }

        cancel.ensure_live(app)?;
        sink.emit(Progress {
            current: 1,
            total: 1,
            text: format!("{verb} {} ({} packages)", app.name, packages.len()),
        });
        commit(packages, cancel)
    }
}

impl<T: AptTransactor> InstallBackend for AptBackend<T> {
    fn id(&self) -> BackendId {
        BackendId::Apt
    }

    fn is_installed(&self, app: &AppRecord) -> EngineResult<bool> {
        match app.resolve_directive(&self.codename) {
            Some(directive) if !directive.main_package.is_empty() => {
                self.transactor.is_installed(&directive.main_package)
            }
            _ => Ok(false),
        }
    }

    fn install(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let directive = self.directive(app)?;
        self.ensure_fresh_cache(app, sink)?;
        cancel.ensure_live(app)?;
        self.enable_source(app, directive)?;
        self.transact(app, "Installing", &directive.install_packages, sink, cancel, |p, c| {
            self.transactor.commit_install(p, c)
        })
    }

    fn remove(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let directive = self.directive(app)?;
        self.transact(app, "Removing", &directive.remove_packages, sink, cancel, |p, c| {
            self.transactor.commit_remove(p, c)
        })
    }

    fn upgrade(
        &self,
        app: &AppRecord,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let directive = self.directive(app)?;
        self.ensure_fresh_cache(app, sink)?;
        self.transact(app, "Upgrading", &directive.install_packages, sink, cancel, |p, c| {
            self.transactor.commit_upgrade(p, c)
        })
    }
}
