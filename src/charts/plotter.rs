//! Chart Plotter Module
//! Draws the dashboard visualizations with egui_plot. Every function here
//! renders one fully-materialized aggregation result; nothing is computed
//! from the raw table at draw time.

use egui::{Color32, Sense};
use egui_plot::{Bar, BarChart, HLine, Legend, Line, LineStyle, Plot, PlotPoints, Points, VLine};

use crate::data::CoBenefit;
use crate::stats::{
    AreaTotal, BeforeAfter, ComfortPoint, ComfortZone, CorrelationMatrix, MapPoint, RankedArea,
    TrendPoint,
};

pub const AIR_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const NOISE_COLOR: Color32 = Color32::from_rgb(243, 156, 18); // Orange
pub const COMFORT_COLOR: Color32 = Color32::from_rgb(46, 204, 113); // Green
pub const OTHER_COLOR: Color32 = Color32::from_rgb(149, 165, 166); // Gray

/// Everything one recomputation pass produces. The viewer renders this bundle
/// as-is; a partial bundle never reaches the screen.
#[derive(Clone)]
pub struct DashboardCharts {
    pub selected_year: i32,
    pub selected_category: CoBenefit,
    pub air_total: f64,
    pub noise_total: f64,
    pub air_trend: Vec<TrendPoint>,
    pub noise_trend: Vec<TrendPoint>,
    pub top_air: Vec<AreaTotal>,
    pub top_noise: Vec<AreaTotal>,
    pub comfort: Vec<ComfortPoint>,
    pub ranking: Vec<RankedArea>,
    pub map_points: Vec<MapPoint>,
    pub correlation: CorrelationMatrix,
    pub before_after: BeforeAfter,
}

pub fn category_color(category: CoBenefit) -> Color32 {
    match category {
        CoBenefit::AirQuality => AIR_COLOR,
        CoBenefit::Noise => NOISE_COLOR,
    }
}

/// KPI formatting: integer value with thousands separators.
pub fn format_total(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Creates the dashboard visualizations using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Yearly trend lines for both categories, with markers.
    pub fn draw_trend_chart(ui: &mut egui::Ui, air: &[TrendPoint], noise: &[TrendPoint]) {
        Plot::new("trend_chart")
            .height(300.0)
            .legend(Legend::default())
            .x_axis_label("Year")
            .y_axis_label("Total Co-Benefit")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                for (series, category) in [(air, CoBenefit::AirQuality), (noise, CoBenefit::Noise)]
                {
                    if series.is_empty() {
                        continue;
                    }
                    let color = category_color(category);
                    let pts: Vec<[f64; 2]> = series
                        .iter()
                        .map(|p| [p.year as f64, p.total])
                        .collect();
                    plot_ui.line(
                        Line::new(PlotPoints::from_iter(pts.iter().copied()))
                            .color(color)
                            .width(2.0)
                            .name(category.label()),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter(pts.iter().copied()))
                            .radius(3.0)
                            .color(color),
                    );
                }
            });
    }

    /// Ranked bar chart of area totals for one category.
    pub fn draw_top_areas_chart(
        ui: &mut egui::Ui,
        id: &str,
        totals: &[AreaTotal],
        category: CoBenefit,
    ) {
        let color = category_color(category);
        let labels: Vec<String> = totals.iter().map(|t| t.area.clone()).collect();

        let bars: Vec<Bar> = totals
            .iter()
            .enumerate()
            .map(|(i, t)| Bar::new(i as f64, t.total).width(0.6).fill(color))
            .collect();

        Plot::new(format!("top_areas_{id}"))
            .height(280.0)
            .x_axis_label("Area")
            .y_axis_label(category.label())
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if mark.value.fract().abs() < 0.01 && idx < labels.len() {
                    labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(category.label()));
            });
    }

    /// Comfort-zone scatter: one point per year, air on x, noise on y, with
    /// dashed mean lines marking the quadrants.
    pub fn draw_comfort_chart(ui: &mut egui::Ui, points: &[ComfortPoint]) {
        let n = points.len();
        let (air_mean, noise_mean) = if n > 0 {
            (
                points.iter().map(|p| p.air).sum::<f64>() / n as f64,
                points.iter().map(|p| p.noise).sum::<f64>() / n as f64,
            )
        } else {
            (0.0, 0.0)
        };

        Plot::new("comfort_chart")
            .height(300.0)
            .legend(Legend::default())
            .x_axis_label("Air Quality Improvement")
            .y_axis_label("Noise Reduction")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                if points.is_empty() {
                    return;
                }

                for (zone, color, name) in [
                    (ComfortZone::MostComfortable, COMFORT_COLOR, "Most Comfortable"),
                    (ComfortZone::Other, OTHER_COLOR, "Other"),
                ] {
                    let pts: PlotPoints = points
                        .iter()
                        .filter(|p| p.zone == zone)
                        .map(|p| [p.air, p.noise])
                        .collect();
                    plot_ui.points(Points::new(pts).radius(4.0).color(color).name(name));
                }

                plot_ui.vline(
                    VLine::new(air_mean)
                        .color(OTHER_COLOR)
                        .style(LineStyle::Dashed { length: 8.0 }),
                );
                plot_ui.hline(
                    HLine::new(noise_mean)
                        .color(OTHER_COLOR)
                        .style(LineStyle::Dashed { length: 8.0 }),
                );
            });
    }

    /// Combined top-area ranking, one bar per (area, category) pair.
    pub fn draw_ranking_chart(ui: &mut egui::Ui, ranking: &[RankedArea]) {
        let labels: Vec<String> = ranking.iter().map(|r| r.area.clone()).collect();

        let mut air_bars: Vec<Bar> = Vec::new();
        let mut noise_bars: Vec<Bar> = Vec::new();
        for (i, r) in ranking.iter().enumerate() {
            let bar = Bar::new(i as f64, r.total)
                .width(0.6)
                .fill(category_color(r.category));
            match r.category {
                CoBenefit::AirQuality => air_bars.push(bar),
                CoBenefit::Noise => noise_bars.push(bar),
            }
        }

        Plot::new("ranking_chart")
            .height(280.0)
            .legend(Legend::default())
            .x_axis_label("Area")
            .y_axis_label("Total Co-Benefit")
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if mark.value.fract().abs() < 0.01 && idx < labels.len() {
                    labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                if !air_bars.is_empty() {
                    plot_ui.bar_chart(
                        BarChart::new(air_bars).name(CoBenefit::AirQuality.label()),
                    );
                }
                if !noise_bars.is_empty() {
                    plot_ui.bar_chart(BarChart::new(noise_bars).name(CoBenefit::Noise.label()));
                }
            });
    }

    /// Simulated area map: one marker per area, sized and colored by the
    /// selected year's value.
    pub fn draw_map_chart(ui: &mut egui::Ui, points: &[MapPoint]) {
        let max_value = points
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max);

        Plot::new("map_chart")
            .height(320.0)
            .x_axis_label("Longitude (simulated)")
            .y_axis_label("Latitude (simulated)")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                for p in points {
                    let t = if max_value > 0.0 {
                        (p.value / max_value).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    let radius = 3.0 + (t.sqrt() * 9.0) as f32;
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter([[p.lon, p.lat]]))
                            .radius(radius)
                            .color(diverging_color(t * 2.0 - 1.0))
                            .name(format!("{} ({:.0})", p.area, p.value)),
                    );
                }
            });
    }

    /// Before/after comparison: grouped bars per category at the two boundary
    /// years.
    pub fn draw_before_after_chart(
        ui: &mut egui::Ui,
        ba: &BeforeAfter,
        year_before: i32,
        year_after: i32,
    ) {
        let air_bars = vec![
            Bar::new(-0.18, ba.air_before).width(0.32).fill(AIR_COLOR),
            Bar::new(0.82, ba.air_after).width(0.32).fill(AIR_COLOR),
        ];
        let noise_bars = vec![
            Bar::new(0.18, ba.noise_before).width(0.32).fill(NOISE_COLOR),
            Bar::new(1.18, ba.noise_after).width(0.32).fill(NOISE_COLOR),
        ];
        let labels = [year_before.to_string(), year_after.to_string()];

        Plot::new("before_after_chart")
            .height(280.0)
            .legend(Legend::default())
            .x_axis_label("Year")
            .y_axis_label("Total Co-Benefit")
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 0.25 && idx < labels.len() {
                    labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(air_bars).name(CoBenefit::AirQuality.label()));
                plot_ui.bar_chart(BarChart::new(noise_bars).name(CoBenefit::Noise.label()));
            });
    }

    /// Year-to-year correlation heatmap. Drawn with the raw painter since
    /// egui_plot has no heatmap primitive; NaN cells render gray.
    pub fn draw_heatmap(ui: &mut egui::Ui, matrix: &CorrelationMatrix) {
        let n = matrix.years.len();
        if n == 0 || matrix.cells.len() != n {
            ui.label("No correlation data");
            return;
        }

        const LABEL_MARGIN: f32 = 40.0;
        let width = ui.available_width().min(680.0);
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 380.0), Sense::hover());
        let painter = ui.painter_at(rect);

        let grid_w = rect.width() - LABEL_MARGIN;
        let grid_h = rect.height() - LABEL_MARGIN;
        let cell_w = grid_w / n as f32;
        let cell_h = grid_h / n as f32;
        let origin = rect.min + egui::vec2(LABEL_MARGIN, 0.0);

        for (i, row) in matrix.cells.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                let cell = egui::Rect::from_min_size(
                    origin + egui::vec2(j as f32 * cell_w, i as f32 * cell_h),
                    egui::vec2(cell_w.ceil(), cell_h.ceil()),
                );
                let color = if v.is_nan() {
                    Color32::from_gray(90)
                } else {
                    diverging_color(v)
                };
                painter.rect_filled(cell, 0.0, color);
            }
        }

        // Sparse year labels so 26 ticks stay readable.
        let text_color = ui.visuals().text_color();
        for (i, year) in matrix.years.iter().enumerate() {
            if i % 5 != 0 {
                continue;
            }
            painter.text(
                origin + egui::vec2(-6.0, (i as f32 + 0.5) * cell_h),
                egui::Align2::RIGHT_CENTER,
                year.to_string(),
                egui::FontId::proportional(10.0),
                text_color,
            );
            painter.text(
                origin + egui::vec2((i as f32 + 0.5) * cell_w, grid_h + 4.0),
                egui::Align2::CENTER_TOP,
                year.to_string(),
                egui::FontId::proportional(10.0),
                text_color,
            );
        }
    }
}

/// Diverging blue-white-red map over [-1, 1].
fn diverging_color(v: f64) -> Color32 {
    let t = ((v.clamp(-1.0, 1.0) + 1.0) / 2.0) as f32;
    let blend = |a: u8, b: u8, f: f32| (a as f32 + (b as f32 - a as f32) * f).round() as u8;
    if t < 0.5 {
        let f = t * 2.0;
        Color32::from_rgb(
            blend(59, 221, f),
            blend(76, 221, f),
            blend(192, 221, f),
        )
    } else {
        let f = (t - 0.5) * 2.0;
        Color32::from_rgb(
            blend(221, 180, f),
            blend(221, 4, f),
            blend(221, 38, f),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_total_groups_thousands() {
        assert_eq!(format_total(0.0), "0");
        assert_eq!(format_total(999.4), "999");
        assert_eq!(format_total(1234.6), "1,235");
        assert_eq!(format_total(1_234_567.0), "1,234,567");
        assert_eq!(format_total(-56_789.0), "-56,789");
    }

    #[test]
    fn diverging_color_endpoints() {
        assert_eq!(diverging_color(-1.0), Color32::from_rgb(59, 76, 192));
        assert_eq!(diverging_color(0.0), Color32::from_rgb(221, 221, 221));
        assert_eq!(diverging_color(1.0), Color32::from_rgb(180, 4, 38));
    }
}
