// Library target for the integration tests under tests/.
// The binary entry point is main.rs; this file re-declares the module tree so
// tests can drive the store, the job runner and the app state directly.
// Some items are only reached from the binary, so suppress dead_code warnings.
#![allow(dead_code)]

pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod jobs;
pub mod logging;
pub mod session;
pub mod store;
pub mod syllabus;
pub mod ui;
