//! The queue state machine: accepts install/remove requests, serializes
//! them, drives the matching backend, and reports every transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;

use crate::backends::{BackendSet, CancelToken, InstallBackend};
use crate::models::{
    AppRecord, EngineErrorKind, EngineResult, Progress, ProgressSink, QueueAction, QueueItem,
    QueueState,
};
use crate::orchestration::{QueueEvent, QueueStateUpdate};

/// How long `drop` waits for a processing backend to acknowledge
/// cancellation before abandoning it.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EnqueueOutcome {
    Accepted(QueueItem),
    /// An item with the same id and action is already pending or processing.
    /// Duplicate enqueues are rejected, surfacing the existing item.
    Duplicate { existing_id: String },
}

struct QueueEntry {
    item: QueueItem,
    app: AppRecord,
    cancel: CancelToken,
    done: Arc<Notify>,
}

#[derive(Default)]
struct QueueInner {
    entries: Vec<QueueEntry>,
}

impl QueueInner {
    fn snapshot(&self) -> Vec<QueueItem> {
        self.entries.iter().map(|entry| entry.item.clone()).collect()
    }

    fn processing(&self) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|entry| entry.item.state == QueueState::Processing)
    }
}

/// Single-flight FIFO orchestrator. At most one item is `Processing` at any
/// time; concurrent package-manager transactions on one system are unsafe.
#[derive(Clone)]
pub struct InstallQueue {
    inner: Arc<Mutex<QueueInner>>,
    backends: BackendSet,
    events: UnboundedSender<QueueEvent>,
    grace_period: Duration,
}

impl InstallQueue {
    pub fn new(backends: BackendSet) -> (Self, UnboundedReceiver<QueueEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(Mutex::new(QueueInner::default())),
                backends,
                events,
                grace_period: DEFAULT_GRACE_PERIOD,
            },
            receiver,
        )
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Accepts a request against a catalog entry. The backend is resolved up
    /// front so an unsupported method can never reach the queue.
    pub async fn enqueue(
        &self,
        app: &AppRecord,
        action: QueueAction,
    ) -> EngineResult<EnqueueOutcome> {
        let backend = self.backends.resolve(app)?;
        let id = format!("{}:{}", backend.id().as_str(), app.uuid());

        let (item, snapshot) = {
            let mut inner = self.inner.lock().await;
            let duplicate = inner.entries.iter().any(|entry| {
                entry.item.id == id
                    && entry.item.action == action
                    && entry.item.state != QueueState::Processed
            });
            if duplicate {
                tracing::info!(%id, ?action, "rejecting duplicate enqueue");
                return Ok(EnqueueOutcome::Duplicate { existing_id: id });
            }

            let item = QueueItem {
                id,
                display_name: app.name.clone(),
                icon: app.icon_relpath(),
                action,
                state: QueueState::Pending,
                success: None,
            };
            inner.entries.push(QueueEntry {
                item: item.clone(),
                app: app.clone(),
                cancel: CancelToken::new(),
                done: Arc::new(Notify::new()),
            });
            (item, inner.snapshot())
        };

        self.emit(QueueEvent::QueueChanged(snapshot));
        Ok(EnqueueOutcome::Accepted(item))
    }

    /// Transitions the oldest pending item to `Processing`, runs its backend
    /// operation on a worker thread, and finishes it as `Processed`. Returns
    /// the finished item, or `None` when nothing was pending or another item
    /// is already in flight.
    pub async fn process_next(&self) -> EngineResult<Option<QueueItem>> {
        let (item, app, cancel, done) = {
            let mut inner = self.inner.lock().await;
            if inner.processing().is_some() {
                return Ok(None);
            }
            let Some(entry) = inner
                .entries
                .iter_mut()
                .find(|entry| entry.item.state == QueueState::Pending)
            else {
                return Ok(None);
            };

            entry.item.state = QueueState::Processing;
            (
                entry.item.clone(),
                entry.app.clone(),
                entry.cancel.clone(),
                entry.done.clone(),
            )
        };

        let verb = match item.action {
            QueueAction::Install => "Installing",
            QueueAction::Remove => "Removing",
        };
        self.emit(QueueEvent::StateChanged(QueueStateUpdate::busy(
            format!("{verb} {}...", item.display_name),
            -1,
            1,
        )));
        self.emit(QueueEvent::QueueChanged(self.inner.lock().await.snapshot()));

        let backend = self.backends.resolve(&app)?;
        let result = run_operation(
            backend,
            app,
            item.action,
            EventProgressSink {
                events: self.events.clone(),
            },
            cancel.clone(),
        )
        .await;

        let finished = {
            let mut inner = self.inner.lock().await;
            let entry = inner
                .entries
                .iter_mut()
                .find(|entry| entry.item.id == item.id && entry.item.action == item.action);
            match entry {
                // Dropped past its grace period; the abandoned outcome is
                // not allowed to overwrite the forced failure.
                Some(entry) if entry.item.state == QueueState::Processed => entry.item.clone(),
                Some(entry) => {
                    entry.item.state = QueueState::Processed;
                    entry.item.success = Some(result.is_ok());
                    entry.item.clone()
                }
                None => item.clone(),
            }
        };
        done.notify_waiters();

        match &result {
            Ok(()) => {
                self.emit(QueueEvent::StateChanged(QueueStateUpdate::ready()));
            }
            Err(error) if error.kind == EngineErrorKind::Cancelled => {
                tracing::info!(id = %finished.id, "operation cancelled");
                self.emit(QueueEvent::StateChanged(QueueStateUpdate::ready()));
            }
            Err(error) => {
                tracing::warn!(id = %finished.id, %error, "operation failed");
                self.emit(QueueEvent::StateChanged(QueueStateUpdate::error(
                    format!("Failed to process {}", finished.display_name),
                    error.message.clone(),
                )));
            }
        }
        self.emit(QueueEvent::QueueChanged(self.inner.lock().await.snapshot()));

        Ok(Some(finished))
    }

    /// Drains the queue, one item at a time.
    pub async fn process_all(&self) -> EngineResult<()> {
        while self.process_next().await?.is_some() {}
        Ok(())
    }

    /// Drops an item. Pending items vanish immediately; a processing item
    /// gets a cancellation request and a bounded wait, after which it is
    /// forced to `Processed`/failed and the backend operation abandoned.
    pub async fn drop_item(&self, id: &str) -> EngineResult<()> {
        let waiting = {
            let mut inner = self.inner.lock().await;
            let Some(position) = inner.entries.iter().position(|entry| entry.item.id == id)
            else {
                tracing::warn!(%id, "drop requested for unknown queue item");
                return Ok(());
            };

            match inner.entries[position].item.state {
                QueueState::Pending => {
                    inner.entries.remove(position);
                    let snapshot = inner.snapshot();
                    drop(inner);
                    self.emit(QueueEvent::QueueChanged(snapshot));
                    return Ok(());
                }
                QueueState::Processed => return Ok(()),
                QueueState::Processing => {
                    let entry = &inner.entries[position];
                    entry.cancel.cancel();
                    (entry.done.clone(), entry.item.display_name.clone())
                }
            }
        };

        let (done, display_name) = waiting;
        if timeout(self.grace_period, done.notified()).await.is_err() {
            // No acknowledgement within the bound. Mark it failed; the
            // backend may still complete in the background, which is an
            // accepted, surfaced risk.
            let forced = {
                let mut inner = self.inner.lock().await;
                let entry = inner
                    .entries
                    .iter_mut()
                    .find(|entry| entry.item.id == id && entry.item.state == QueueState::Processing);
                match entry {
                    Some(entry) => {
                        entry.item.state = QueueState::Processed;
                        entry.item.success = Some(false);
                        Some(inner.snapshot())
                    }
                    None => None,
                }
            };

            if let Some(snapshot) = forced {
                tracing::warn!(%id, "backend did not acknowledge cancellation, abandoning");
                self.emit(QueueEvent::StateChanged(QueueStateUpdate::error(
                    format!("Cancelled {display_name}"),
                    "The operation did not stop in time and was abandoned.".to_string(),
                )));
                self.emit(QueueEvent::QueueChanged(snapshot));
            }
        }

        Ok(())
    }

    /// Removes every processed item, regardless of outcome.
    pub async fn clear_completed(&self) {
        let snapshot = {
            let mut inner = self.inner.lock().await;
            inner
                .entries
                .retain(|entry| entry.item.state != QueueState::Processed);
            inner.snapshot()
        };
        self.emit(QueueEvent::QueueChanged(snapshot));
    }

    pub async fn snapshot(&self) -> Vec<QueueItem> {
        self.inner.lock().await.snapshot()
    }

    fn emit(&self, event: QueueEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("queue event receiver dropped");
        }
    }
}

async fn run_operation(
    backend: Arc<dyn InstallBackend>,
    app: AppRecord,
    action: QueueAction,
    sink: EventProgressSink,
    cancel: CancelToken,
) -> EngineResult<()> {
    tokio::task::spawn_blocking(move || match action {
        QueueAction::Install => backend.install(&app, &sink, &cancel),
        QueueAction::Remove => backend.remove(&app, &sink, &cancel),
    })
    .await
    .map_err(|join_error| {
        crate::models::EngineError::new(
            EngineErrorKind::Internal,
            format!("backend worker join failure: {join_error}"),
        )
    })?
}

/// Bridges backend progress onto the event channel as busy status updates.
struct EventProgressSink {
    events: UnboundedSender<QueueEvent>,
}

impl ProgressSink for EventProgressSink {
    fn emit(&self, progress: Progress) {
        let update = QueueStateUpdate {
            status: crate::orchestration::QueueStatus::Busy,
            action_text: progress.text,
            details_text: if progress.total > 0 {
                format!("{} of {}", progress.current, progress.total)
            } else {
                String::new()
            },
            value: progress.current as i64,
            value_end: progress.total as i64,
        };
        let _ = self.events.send(QueueEvent::StateChanged(update));
    }
}
