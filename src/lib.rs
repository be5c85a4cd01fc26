#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod player;
pub mod session;
pub mod storage;
pub mod ui;
pub mod update;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
