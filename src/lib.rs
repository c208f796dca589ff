// Library surface shared by the binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod fetcher;
pub mod metrics;
pub mod quote;
pub mod runtime;
pub mod session;
pub mod ui;
