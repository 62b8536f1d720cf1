pub mod app;
pub mod error;
pub mod progress;
pub mod queue;

pub use app::{AppRecord, InstallDirective, InstallMethod, PackageSource};
pub use error::{EngineError, EngineErrorKind, EngineResult};
pub use progress::{NullProgressSink, Progress, ProgressSink};
pub use queue::{QueueAction, QueueItem, QueueState};
