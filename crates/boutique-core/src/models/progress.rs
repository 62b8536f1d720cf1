/// Structured progress notification. Backends report positional values, the
/// presentation layer owns the phrasing; no placeholder-token templating.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub text: String,
}

/// Write-only channel backends push progress into. Implementations must be
/// callable from a blocking worker thread.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: Progress);
}

/// Sink that drops everything, for operations nobody is watching.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _progress: Progress) {}
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::{Progress, ProgressSink};

    /// Records every notification for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        pub seen: Mutex<Vec<Progress>>,
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, progress: Progress) {
            self.seen.lock().expect("sink poisoned").push(progress);
        }
    }
}
