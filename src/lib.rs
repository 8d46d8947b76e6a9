//! Load-test report renderer.
//!
//! Reads per-instance monitoring CSVs, aligns them on a one-second grid and
//! renders multi-panel comparison charts.

pub mod app;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod render;
pub mod state;
