pub mod apt;
pub mod backend;
pub mod inert;
pub mod snap;

pub use apt::{AptBackend, AptTransactor, ManualSource};
pub use backend::{BackendId, BackendSet, CancelToken, InstallBackend};
pub use inert::InertBackend;
pub use snap::{SnapBackend, SnapStore};
