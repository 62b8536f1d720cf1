pub mod backends;
pub mod catalog;
pub mod compiler;
pub mod context;
pub mod distro;
pub mod facade;
pub mod models;
pub mod orchestration;
pub mod prefs;
