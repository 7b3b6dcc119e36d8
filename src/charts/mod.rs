//! Charts module - dashboard chart drawing

mod plotter;

pub use plotter::{format_total, ChartPlotter, DashboardCharts, AIR_COLOR, NOISE_COLOR};
