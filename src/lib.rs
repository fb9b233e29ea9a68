//! jobwatch: registry-backed job tickets and a live terminal status renderer.

pub mod config;
pub mod demo;
pub mod error;
pub mod job;
pub mod logging;
pub mod ui;
