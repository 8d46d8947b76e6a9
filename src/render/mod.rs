//! Chart rendering with plotters: one panel per grid cell, saved as SVG and PNG.

pub mod figure;
pub mod plot;

pub use figure::save_figure;
