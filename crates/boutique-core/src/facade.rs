//! Engine facade: the sole integration surface toward the presentation
//! layer. Translates inbound request names into catalog, queue, and
//! preference operations and pushes results back over the message channel.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::backends::BackendSet;
use crate::catalog::Catalog;
use crate::context::SessionContext;
use crate::models::{
    AppRecord, EngineError, EngineErrorKind, EngineResult, QueueAction, QueueItem,
};
use crate::orchestration::{InstallQueue, QueueEvent};
use crate::prefs::Preferences;

/// Opaque ordered transport toward the presentation layer. Implementations
/// must accept sends from the thread processing the current queue item.
pub trait MessageChannel: Send + Sync {
    fn send(&self, name: &str, payload: Value);
}

/// Desktop side effects the facade delegates rather than owns.
pub trait SystemActions: Send + Sync {
    fn open_uri(&self, uri: &str) -> EngineResult<()>;

    fn launch(&self, command: &str) -> EngineResult<()>;
}

/// Process-spawning implementation used by the real application.
pub struct DesktopActions;

impl SystemActions for DesktopActions {
    fn open_uri(&self, uri: &str) -> EngineResult<()> {
        std::process::Command::new("xdg-open")
            .arg(uri)
            .spawn()
            .map(|_| ())
            .map_err(|error| {
                EngineError::new(EngineErrorKind::Internal, format!("xdg-open: {error}"))
            })
    }

    fn launch(&self, command: &str) -> EngineResult<()> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            EngineError::new(EngineErrorKind::InvalidRequest, "empty launch command")
        })?;
        std::process::Command::new(program)
            .args(parts)
            .spawn()
            .map(|_| ())
            .map_err(|error| {
                EngineError::new(EngineErrorKind::Internal, format!("{program}: {error}"))
            })
    }
}

pub struct Engine {
    catalog: Catalog,
    prefs: Mutex<Preferences>,
    backends: BackendSet,
    queue: InstallQueue,
    context: SessionContext,
    channel: Arc<dyn MessageChannel>,
    actions: Arc<dyn SystemActions>,
    assets_root: Option<PathBuf>,
}

impl Engine {
    /// Wires the engine together and starts forwarding queue events to the
    /// channel. Must be called within a tokio runtime.
    pub fn new(
        catalog: Catalog,
        prefs: Preferences,
        backends: BackendSet,
        context: SessionContext,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        let (queue, events) = InstallQueue::new(backends.clone());
        spawn_event_pump(events, channel.clone());

        Self {
            catalog,
            prefs: Mutex::new(prefs),
            backends,
            queue,
            context,
            channel,
            actions: Arc::new(DesktopActions),
            assets_root: None,
        }
    }

    pub fn with_actions(mut self, actions: Arc<dyn SystemActions>) -> Self {
        self.actions = actions;
        self
    }

    /// Directory holding the compiled icon/screenshot assets; used to
    /// compute derived presentation paths.
    pub fn with_assets_root(mut self, assets_root: impl Into<PathBuf>) -> Self {
        self.assets_root = Some(assets_root.into());
        self
    }

    pub fn queue(&self) -> &InstallQueue {
        &self.queue
    }

    /// Dispatches one inbound request. Failures are reported back over the
    /// channel as a `request_failed` event and returned to the caller; they
    /// are never fatal to the engine.
    pub async fn dispatch(&self, name: &str, data: &Value) -> EngineResult<()> {
        let result = self.handle(name, data).await;
        if let Err(error) = &result {
            tracing::warn!(request = name, %error, "request failed");
            self.channel.send(
                "request_failed",
                json!({
                    "request": name,
                    "kind": error.kind,
                    "message": error.message,
                }),
            );
        }
        result
    }

    async fn handle(&self, name: &str, data: &Value) -> EngineResult<()> {
        match name {
            "request_category_list" => self.request_category_list(data),
            "app_info" => self.app_info(data),
            "app_install" | "app_reinstall" => {
                self.enqueue_request(data, QueueAction::Install).await
            }
            "app_remove" => self.enqueue_request(data, QueueAction::Remove).await,
            "app_launch" => self.app_launch(data),
            "queue_clear" => {
                self.queue.clear_completed().await;
                Ok(())
            }
            "queue_drop_item" => {
                let id = str_field(data, "id")?;
                self.queue.drop_item(id).await
            }
            "settings_set_key" => self.settings_set_key(data),
            "open_uri" => self.open_uri(data),
            _ => Err(EngineError::new(
                EngineErrorKind::UnknownRequest,
                format!("no handler for request '{name}'"),
            )),
        }
    }

    fn request_category_list(&self, data: &Value) -> EngineResult<()> {
        let category = str_field(data, "category")?;
        let apps: Vec<Value> = self
            .catalog
            .list_category(category)
            .into_iter()
            .filter(|app| {
                app.listed && app.supports(&self.context.os_arch, &self.context.os_codename)
            })
            .map(|app| self.app_summary(app))
            .collect();

        self.channel.send(
            "populate_app_list",
            json!({ "category": category, "apps": apps }),
        );
        Ok(())
    }

    fn app_info(&self, data: &Value) -> EngineResult<()> {
        let app = self.lookup_app(data)?;
        let mut payload = serde_json::to_value(app).map_err(|error| {
            EngineError::new(EngineErrorKind::Internal, format!("serialize app: {error}"))
        })?;

        if let Value::Object(fields) = &mut payload {
            fields.insert("id".to_string(), json!(app.uuid()));
            fields.insert("installed".to_string(), json!(self.is_installed(app)));
            fields.insert("icon".to_string(), json!(app.icon_relpath()));
            fields.insert(
                "screenshots".to_string(),
                json!(app.screenshot_relpaths(self.screenshot_count(app))),
            );
            let show_advanced = self
                .preference("show_advanced_details", json!(false))
                .as_bool()
                .unwrap_or(false);
            if !show_advanced {
                fields.remove("installation");
            }
        }

        self.channel.send("open_app_details", payload);
        Ok(())
    }

    async fn enqueue_request(&self, data: &Value, action: QueueAction) -> EngineResult<()> {
        let app = self.lookup_app(data)?.clone();
        self.queue.enqueue(&app, action).await?;

        // Kick the queue on a background task; events report the outcome.
        let queue = self.queue.clone();
        tokio::spawn(async move {
            if let Err(error) = queue.process_all().await {
                tracing::error!(%error, "queue processing stopped");
            }
        });
        Ok(())
    }

    fn app_launch(&self, data: &Value) -> EngineResult<()> {
        let app = self.lookup_app(data)?;
        let command = app.launch_cmd.as_deref().ok_or_else(|| {
            EngineError::for_app(
                app.uuid(),
                EngineErrorKind::InvalidRequest,
                "app has no launch command",
            )
        })?;
        self.actions.launch(command)
    }

    fn settings_set_key(&self, data: &Value) -> EngineResult<()> {
        let key = str_field(data, "key")?;
        let value = data.get("value").cloned().ok_or_else(|| {
            EngineError::new(EngineErrorKind::InvalidRequest, "missing 'value' field")
        })?;
        self.prefs
            .lock()
            .map_err(|_| EngineError::new(EngineErrorKind::Internal, "preferences lock poisoned"))?
            .write(key, value)
    }

    fn open_uri(&self, data: &Value) -> EngineResult<()> {
        let uri = str_field(data, "uri")?;
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(EngineError::new(
                EngineErrorKind::InvalidRequest,
                format!("refusing to open non-http uri '{uri}'"),
            ));
        }
        self.actions.open_uri(uri)
    }

    pub fn preference(&self, key: &str, default: Value) -> Value {
        match self.prefs.lock() {
            Ok(mut prefs) => prefs.read(key, default),
            Err(_) => default,
        }
    }

    fn lookup_app(&self, data: &Value) -> EngineResult<&AppRecord> {
        let category = str_field(data, "category")?;
        let app_id = str_field(data, "app_id")?;
        self.catalog.get(category, app_id).ok_or_else(|| {
            EngineError::new(
                EngineErrorKind::InvalidRequest,
                format!("no app '{category}/{app_id}' in the catalog"),
            )
        })
    }

    fn app_summary(&self, app: &AppRecord) -> Value {
        json!({
            "id": app.uuid(),
            "name": app.name,
            "summary": app.summary,
            "method": String::from(app.method.clone()),
            "icon": app.icon_relpath(),
            "proprietary": app.proprietary,
            "installed": self.is_installed(app),
        })
    }

    fn is_installed(&self, app: &AppRecord) -> bool {
        match self.backends.resolve(app) {
            Ok(backend) => backend.is_installed(app).unwrap_or(false),
            Err(_) => false,
        }
    }

    fn screenshot_count(&self, app: &AppRecord) -> usize {
        let Some(root) = &self.assets_root else {
            return 0;
        };
        let prefix = format!("{}-", app.id);
        std::fs::read_dir(root.join("screenshots"))
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|entry| {
                        entry
                            .file_name()
                            .to_string_lossy()
                            .starts_with(prefix.as_str())
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

fn spawn_event_pump(mut events: UnboundedReceiver<QueueEvent>, channel: Arc<dyn MessageChannel>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                QueueEvent::QueueChanged(queue) => {
                    channel.send("update_queue_list", queue_payload(&queue));
                }
                QueueEvent::StateChanged(update) => {
                    let payload = serde_json::to_value(&update).unwrap_or(Value::Null);
                    channel.send("update_queue_state", payload);
                }
            }
        }
    });
}

fn queue_payload(queue: &[QueueItem]) -> Value {
    json!({ "queue": queue })
}

fn str_field<'a>(data: &'a Value, field: &str) -> EngineResult<&'a str> {
    data.get(field).and_then(Value::as_str).ok_or_else(|| {
        EngineError::new(
            EngineErrorKind::InvalidRequest,
            format!("missing '{field}' field"),
        )
    })
}
