//! Chart Viewer Widget
//! Central scrollable panel: KPI header plus the dashboard's chart cards,
//! all rendered from one fully-materialized `DashboardCharts` bundle.

use crate::charts::{format_total, ChartPlotter, DashboardCharts};
use egui::{Color32, RichText, ScrollArea};

const CARD_SPACING: f32 = 15.0;

/// Scrollable chart display area.
pub struct ChartViewer {
    charts: Option<DashboardCharts>,
}

impl Default for ChartViewer {
    fn default() -> Self {
        Self { charts: None }
    }
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the current bundle (new data source incoming).
    pub fn clear(&mut self) {
        self.charts = None;
    }

    /// Swap in a freshly recomputed bundle.
    pub fn set_charts(&mut self, charts: DashboardCharts) {
        self.charts = Some(charts);
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(charts) = &self.charts else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                Self::draw_kpi_header(ui, charts);
                ui.add_space(CARD_SPACING);

                Self::card(
                    ui,
                    "📈 Yearly Co-Benefit Trend",
                    "Both indicators summed over all areas, per projection year.",
                    |ui| ChartPlotter::draw_trend_chart(ui, &charts.air_trend, &charts.noise_trend),
                );

                Self::card(
                    ui,
                    "🌬 Top 5 Areas – Air Quality Improvement",
                    "Highest air-quality totals over the full 2025-2050 range.",
                    |ui| {
                        ChartPlotter::draw_top_areas_chart(
                            ui,
                            "air",
                            &charts.top_air,
                            crate::data::CoBenefit::AirQuality,
                        )
                    },
                );

                Self::card(
                    ui,
                    "🔇 Top 5 Areas – Noise Reduction",
                    "Highest noise-reduction totals over the full 2025-2050 range.",
                    |ui| {
                        ChartPlotter::draw_top_areas_chart(
                            ui,
                            "noise",
                            &charts.top_noise,
                            crate::data::CoBenefit::Noise,
                        )
                    },
                );

                Self::card(
                    ui,
                    "🎯 Comfort Zone Analysis",
                    "Years with above-average air improvement and below-average noise reduction.",
                    |ui| ChartPlotter::draw_comfort_chart(ui, &charts.comfort),
                );

                Self::card(
                    ui,
                    "🏆 Top Areas by Combined Co-Benefit",
                    "Top 10 (area, category) totals across all years.",
                    |ui| ChartPlotter::draw_ranking_chart(ui, &charts.ranking),
                );

                Self::card(
                    ui,
                    &format!(
                        "🗺 Area Map – {} in {}",
                        charts.selected_category.label(),
                        charts.selected_year
                    ),
                    "Coordinates are simulated, not real locations; marker size tracks the selected year's value.",
                    |ui| ChartPlotter::draw_map_chart(ui, &charts.map_points),
                );

                Self::card(
                    ui,
                    "🔥 Year-to-Year Correlation",
                    "Pearson correlation between year columns, both categories mixed.",
                    |ui| ChartPlotter::draw_heatmap(ui, &charts.correlation),
                );

                Self::card(
                    ui,
                    "⏳ Before & After (2025 vs 2050)",
                    "Category totals at the boundary years of the projection.",
                    |ui| {
                        ChartPlotter::draw_before_after_chart(ui, &charts.before_after, 2025, 2050)
                    },
                );
            });
    }

    /// Two headline metrics, one per co-benefit category.
    fn draw_kpi_header(ui: &mut egui::Ui, charts: &DashboardCharts) {
        ui.horizontal(|ui| {
            for (label, value, color) in [
                (
                    "🌬 Total Air Quality Improvement",
                    charts.air_total,
                    crate::charts::AIR_COLOR,
                ),
                (
                    "🔇 Total Noise Reduction",
                    charts.noise_total,
                    crate::charts::NOISE_COLOR,
                ),
            ] {
                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(8.0)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.vertical(|ui| {
                            ui.label(RichText::new(label).size(12.0).color(Color32::GRAY));
                            ui.label(
                                RichText::new(format_total(value))
                                    .size(24.0)
                                    .strong()
                                    .color(color),
                            );
                        });
                    });
                ui.add_space(CARD_SPACING);
            }
        });
    }

    fn card(ui: &mut egui::Ui, title: &str, note: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width() - 20.0);
                ui.vertical(|ui| {
                    ui.label(RichText::new(title).size(16.0).strong());
                    ui.add_space(8.0);
                    add_contents(ui);
                    if !note.is_empty() {
                        ui.add_space(4.0);
                        ui.label(RichText::new(note).size(11.0).italics().color(Color32::GRAY));
                    }
                });
            });
        ui.add_space(CARD_SPACING);
    }
}
