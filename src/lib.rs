pub mod app;
pub mod automation;
pub mod bridge;
pub mod common;
pub mod launcher;
pub mod qr;
pub mod server;
pub mod ui;
pub mod uno;
