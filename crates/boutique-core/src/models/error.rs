use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineErrorKind {
    CatalogMissing,
    CatalogCorrupt,
    CatalogSchemaMismatch,
    ValidationFault,
    UnsupportedMethod,
    TransactionFailed,
    Cancelled,
    PersistFailure,
    UnknownRequest,
    InvalidRequest,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct EngineError {
    /// Catalog uuid of the app this error is attributed to, when there is one.
    pub app: Option<String>,
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            app: None,
            kind,
            message: message.into(),
        }
    }

    pub fn for_app(app: impl Into<String>, kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            app: Some(app.into()),
            kind,
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
